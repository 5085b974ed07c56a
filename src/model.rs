use crate::domain::{DEFAULT_CHANGELIST, IGNORE_ON_COMMIT, StatusEntry};
use crate::status::{LineKind, classify};

const DEFAULT_CHANGELIST_HEADER: &str = "--- Changelist 'default':";

/// One display row: a changelist header or an index into the entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Header(String),
    Entry(usize),
}

/// Parsed `svn status` state. Rebuilt wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingCopyModel {
    entries: Vec<StatusEntry>,
    changelists: Vec<String>,
}

impl WorkingCopyModel {
    pub fn rebuild<I, S>(lines: I, show_unversioned: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = Self::default();
        let mut current: Option<String> = None;

        for line in lines {
            let line = line.as_ref();
            match classify(line, show_unversioned) {
                LineKind::ChangelistHeader { name: Some(name) } => {
                    model.register_changelist(&name);
                    current = Some(name);
                }
                LineKind::ChangelistHeader { name: None } | LineKind::Ignorable => {}
                LineKind::Entry { status, path } => {
                    let changelist = match &current {
                        Some(name) => name.clone(),
                        None => {
                            let name = implicit_default_changelist();
                            model.register_changelist(&name);
                            current = Some(name.clone());
                            name
                        }
                    };
                    model.entries.push(StatusEntry {
                        raw_line: line.to_string(),
                        status,
                        path,
                        checked: false,
                        changelist,
                    });
                }
            }
        }

        model.register_changelist(IGNORE_ON_COMMIT);
        model
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&StatusEntry> {
        self.entries.get(index)
    }

    pub fn changelists(&self) -> &[String] {
        &self.changelists
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether the checked state actually changed.
    pub fn set_checked(&mut self, index: usize, value: bool) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if entry.checked == value {
            return false;
        }
        entry.checked = value;
        true
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        match self.entries.get(index).map(|entry| entry.checked) {
            Some(checked) => self.set_checked(index, !checked),
            None => false,
        }
    }

    /// Returns how many entries changed state.
    pub fn set_changelist_checked(&mut self, changelist: &str, value: bool) -> usize {
        let mut changed = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.changelist == changelist && entry.checked != value)
        {
            entry.checked = value;
            changed += 1;
        }
        changed
    }

    pub fn set_all_checked(&mut self, value: bool) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.checked != value) {
            entry.checked = value;
            changed += 1;
        }
        changed
    }

    pub fn changelist_fully_checked(&self, changelist: &str) -> bool {
        let mut members = self
            .entries
            .iter()
            .filter(|entry| entry.changelist == changelist)
            .peekable();
        members.peek().is_some() && members.all(|entry| entry.checked)
    }

    pub fn checked_entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(|entry| entry.checked)
    }

    pub fn checked_count(&self) -> usize {
        self.checked_entries().count()
    }

    pub fn checked_paths(&self) -> Vec<&str> {
        self.checked_entries()
            .map(|entry| entry.path.as_str())
            .collect()
    }

    /// Entries grouped under a header row each time the changelist changes.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.entries.len() + self.changelists.len());
        let mut last: Option<&str> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if last != Some(entry.changelist.as_str()) {
                rows.push(Row::Header(entry.changelist.clone()));
                last = Some(entry.changelist.as_str());
            }
            rows.push(Row::Entry(index));
        }
        rows
    }

    fn register_changelist(&mut self, name: &str) {
        if !self.changelists.iter().any(|known| known == name) {
            self.changelists.push(name.to_string());
        }
    }
}

fn implicit_default_changelist() -> String {
    match classify(DEFAULT_CHANGELIST_HEADER, false) {
        LineKind::ChangelistHeader { name: Some(name) } => name,
        _ => DEFAULT_CHANGELIST.to_string(),
    }
}
