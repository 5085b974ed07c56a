use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CHANGELIST: &str = "default";
pub const IGNORE_ON_COMMIT: &str = "ignore-on-commit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Modified,
    Added,
    Deleted,
    Unversioned,
    Unknown,
}

impl StatusCode {
    pub fn from_status_char(c: char) -> Self {
        match c {
            'M' => Self::Modified,
            'A' => Self::Added,
            'D' => Self::Deleted,
            '?' => Self::Unversioned,
            _ => Self::Unknown,
        }
    }

    pub fn as_symbol(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Unversioned => '?',
            Self::Unknown => ' ',
        }
    }

    pub fn is_versioned_change(self) -> bool {
        matches!(self, Self::Modified | Self::Added | Self::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub raw_line: String,
    pub status: StatusCode,
    pub path: String,
    pub checked: bool,
    pub changelist: String,
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            if self.checked { 'x' } else { ' ' },
            self.status.as_symbol(),
            self.path
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffText {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Commit,
    CreatePatch,
    Diff,
    Revert,
    Add,
    Remove,
    Edit,
    Changelist,
    Refresh,
}

impl Action {
    /// Entries offered in the per-entry action menu.
    pub const MENU: [Action; 7] = [
        Action::Diff,
        Action::Revert,
        Action::Add,
        Action::Remove,
        Action::Edit,
        Action::Changelist,
        Action::Refresh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Action::Commit => "commit",
            Action::CreatePatch => "create-patch",
            Action::Diff => "diff",
            Action::Revert => "revert",
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Edit => "edit",
            Action::Changelist => "changelist",
            Action::Refresh => "refresh",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::Commit => "commit checked files (non-recursive)",
            Action::CreatePatch => "write a patch of checked files",
            Action::Diff => "show changes of the entry",
            Action::Revert => "discard local changes",
            Action::Add => "schedule for addition",
            Action::Remove => "delete the file from disk",
            Action::Edit => "open in $VISUAL / $EDITOR",
            Action::Changelist => "move to another changelist",
            Action::Refresh => "re-run svn status",
        }
    }

    pub fn is_dangerous(self) -> bool {
        matches!(self, Action::Remove)
    }

    /// Actions that submit the checked set and need a message.
    pub fn is_submit(self) -> bool {
        matches!(self, Action::Commit | Action::CreatePatch)
    }

    pub fn applies_to(self, status: Option<StatusCode>) -> bool {
        match self {
            Action::Refresh => true,
            Action::Revert => status.is_some_and(StatusCode::is_versioned_change),
            Action::Add | Action::Remove => status == Some(StatusCode::Unversioned),
            Action::Diff | Action::Changelist => {
                status.is_some_and(StatusCode::is_versioned_change)
            }
            Action::Edit => status.is_some_and(|s| s != StatusCode::Deleted),
            Action::Commit | Action::CreatePatch => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: Action,
    pub targets: Vec<String>,
    pub message: Option<String>,
    pub output: Option<PathBuf>,
    pub changelist: Option<String>,
}

impl ActionRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            targets: Vec::new(),
            message: None,
            output: None,
            changelist: None,
        }
    }

    pub fn with_target(action: Action, target: impl Into<String>) -> Self {
        Self {
            targets: vec![target.into()],
            ..Self::new(action)
        }
    }

    pub fn target_label(&self) -> String {
        match self.targets.as_slice() {
            [] => "(none)".to_string(),
            [one] => one.clone(),
            [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Lifetime of one commit session. Commits happen inside `Populated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Populated,
    Closed,
}
