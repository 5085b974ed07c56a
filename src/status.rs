//! Classification of single `svn status` output lines.
//!
//! svn prints a fixed-width prefix before each path: the item status
//! column, the lock column, and two padding columns. Changelist groups are
//! introduced by a `--- Changelist 'NAME':` line.

use crate::domain::StatusCode;

const CHANGELIST_PREFIX: &str = "--- Changelist";
const STATUS_PREFIX_WIDTH: usize = 4;
const TRACKED_PREFIXES: [&str; 4] = ["M", "A", "D", " M"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `None` when the header carries no quoted name.
    ChangelistHeader { name: Option<String> },
    Entry { status: StatusCode, path: String },
    Ignorable,
}

pub fn classify(line: &str, show_unversioned: bool) -> LineKind {
    if line.starts_with(CHANGELIST_PREFIX) {
        return LineKind::ChangelistHeader {
            name: changelist_name(line),
        };
    }

    if TRACKED_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        let code = line
            .chars()
            .find(|c| *c != ' ')
            .map_or(StatusCode::Unknown, StatusCode::from_status_char);
        return LineKind::Entry {
            status: code,
            path: entry_path(line),
        };
    }

    if show_unversioned && line.starts_with('?') {
        return LineKind::Entry {
            status: StatusCode::Unversioned,
            path: entry_path(line),
        };
    }

    LineKind::Ignorable
}

/// Drops the status columns and trims what is left.
pub fn entry_path(line: &str) -> String {
    match line.char_indices().nth(STATUS_PREFIX_WIDTH) {
        Some((offset, _)) => line[offset..].trim().to_string(),
        None => String::new(),
    }
}

fn changelist_name(line: &str) -> Option<String> {
    let start = line.find('\'')? + 1;
    let len = line[start..].find('\'')?;
    Some(line[start..start + len].to_string())
}
