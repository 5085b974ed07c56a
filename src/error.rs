use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the svn subprocess or of the filesystem work done on its behalf.
#[derive(Debug, Error)]
pub enum SvnError {
    /// The binary could not be started (missing from `$PATH`, not executable, ...).
    #[error("failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit, or -1 when the process was killed by a signal.
    #[error("svn {subcommand} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        subcommand: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SvnError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
