use crate::command::{CommandPlan, status_args};
use crate::domain::CommandResult;
use crate::error::SvnError;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Blocking access to the svn binary. Every call waits for the process.
pub trait SvnClient: Send + Sync {
    fn working_dir(&self) -> &Path;
    fn run(&self, args: &[OsString]) -> Result<CommandResult, SvnError>;
    fn run_to_file(&self, args: &[OsString], output: &Path) -> Result<CommandResult, SvnError>;

    /// Raw `svn st` lines; a non-zero exit is an error.
    fn status(&self) -> Result<Vec<String>, SvnError> {
        let args = status_args();
        let result = self.run(&args)?;
        if !result.success() {
            return Err(command_failed(&args, result));
        }
        Ok(result.stdout.lines().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone)]
pub struct ShellSvnClient {
    binary: String,
    working_dir: PathBuf,
}

impl Default for ShellSvnClient {
    fn default() -> Self {
        Self::new("svn")
    }
}

impl ShellSvnClient {
    pub fn new(binary: impl Into<String>) -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            binary: binary.into(),
            working_dir,
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.working_dir)
            .args(args)
            .stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> SvnError {
        SvnError::Spawn {
            binary: self.binary.clone(),
            source,
        }
    }
}

impl SvnClient for ShellSvnClient {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&self, args: &[OsString]) -> Result<CommandResult, SvnError> {
        let started = Instant::now();
        let output = self
            .command(args)
            .output()
            .map_err(|err| self.spawn_error(err))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        Ok(CommandResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        })
    }

    fn run_to_file(&self, args: &[OsString], output: &Path) -> Result<CommandResult, SvnError> {
        let file = File::create(output).map_err(|source| SvnError::Io {
            action: "failed to create",
            path: output.to_path_buf(),
            source,
        })?;

        let started = Instant::now();
        let result = self
            .command(args)
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| self.spawn_error(err))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        Ok(CommandResult {
            exit_code: result.status.code().unwrap_or(-1),
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
            duration_ms,
        })
    }
}

/// Runs a plan to completion. Deleting a path reports exit code 0.
pub fn execute_plan(client: &dyn SvnClient, plan: &CommandPlan) -> Result<CommandResult, SvnError> {
    match plan {
        CommandPlan::Svn(args) => client.run(args),
        CommandPlan::SvnToFile { args, output } => client.run_to_file(args, output),
        CommandPlan::DeletePath(path) => {
            let started = Instant::now();
            delete_path(path)?;
            Ok(CommandResult {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: started.elapsed().as_millis() as u64,
            })
        }
    }
}

fn delete_path(path: &Path) -> Result<(), SvnError> {
    let io_error = |source| SvnError::Io {
        action: "failed to remove",
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::symlink_metadata(path).map_err(io_error)?;
    if metadata.file_type().is_dir() {
        fs::remove_dir_all(path).map_err(io_error)
    } else {
        fs::remove_file(path).map_err(io_error)
    }
}

pub fn command_failed(args: &[OsString], result: CommandResult) -> SvnError {
    SvnError::CommandFailed {
        subcommand: args
            .first()
            .map(|arg| arg.to_string_lossy().to_string())
            .unwrap_or_default(),
        exit_code: result.exit_code,
        stderr: result.stderr.trim().to_string(),
    }
}
