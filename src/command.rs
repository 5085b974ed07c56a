//! Argument vectors for the svn subcommands the tool runs.
//!
//! The builders do not validate the selection; an empty checked set still
//! yields a well-formed argument list. `plan_for` is where empty selections
//! are refused.

use crate::domain::{Action, ActionRequest, DEFAULT_CHANGELIST};
use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DIFF_PREFIX: [&str; 4] = ["diff", "-N", "-x", "--ignore-eol-style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    Svn(Vec<OsString>),
    /// stdout is streamed verbatim into `output`.
    SvnToFile {
        args: Vec<OsString>,
        output: PathBuf,
    },
    /// Removed from disk without going through svn.
    DeletePath(PathBuf),
}

pub fn status_args() -> Vec<OsString> {
    vec![os("st")]
}

pub fn commit_args<S: AsRef<str>>(message: &str, paths: &[S]) -> Vec<OsString> {
    let mut args = vec![os("commit"), os("-N"), os("-m"), os(message)];
    args.extend(paths.iter().map(|path| os(path.as_ref())));
    args
}

pub fn create_patch_args<S: AsRef<str>>(paths: &[S]) -> Vec<OsString> {
    let mut args: Vec<OsString> = DIFF_PREFIX.into_iter().map(os).collect();
    args.extend(paths.iter().map(|path| os(path.as_ref())));
    args
}

pub fn diff_args(path: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = DIFF_PREFIX.into_iter().map(os).collect();
    args.push(os(path));
    args
}

pub fn revert_args(path: &str) -> Vec<OsString> {
    vec![os("revert"), os(path)]
}

pub fn add_args(path: &str) -> Vec<OsString> {
    vec![os("add"), os(path)]
}

pub fn changelist_args<S: AsRef<str>>(name: &str, paths: &[S]) -> Vec<OsString> {
    let mut args = vec![os("changelist"), os(name)];
    args.extend(paths.iter().map(|path| os(path.as_ref())));
    args
}

pub fn remove_from_changelist_args<S: AsRef<str>>(paths: &[S]) -> Vec<OsString> {
    let mut args = vec![os("changelist"), os("--remove")];
    args.extend(paths.iter().map(|path| os(path.as_ref())));
    args
}

/// Turns a request into the concrete work to perform. Commit and patch use
/// the paths captured in `request.targets` when the submit was started, not
/// the live checked set. Relative targets are resolved against `working_dir`
/// only for filesystem operations.
pub fn plan_for(request: &ActionRequest, working_dir: &Path) -> Result<CommandPlan> {
    let plan = match request.action {
        Action::Commit => CommandPlan::Svn(commit_args(
            request.message.as_deref().unwrap_or_default(),
            submit_targets(request)?,
        )),
        Action::CreatePatch => CommandPlan::SvnToFile {
            args: create_patch_args(submit_targets(request)?),
            output: request
                .output
                .clone()
                .context("create-patch requires an output file")?,
        },
        Action::Diff => CommandPlan::Svn(diff_args(single_target(request)?)),
        Action::Revert => CommandPlan::Svn(revert_args(single_target(request)?)),
        Action::Add => CommandPlan::Svn(add_args(single_target(request)?)),
        Action::Remove => {
            let target = single_target(request)?;
            if target.is_empty() {
                bail!("remove requires a non-empty path");
            }
            CommandPlan::DeletePath(working_dir.join(target))
        }
        Action::Changelist => {
            if request.targets.is_empty() {
                bail!("changelist requires at least one target");
            }
            match request.changelist.as_deref() {
                Some(DEFAULT_CHANGELIST) => {
                    CommandPlan::Svn(remove_from_changelist_args(&request.targets))
                }
                Some(name) => CommandPlan::Svn(changelist_args(name, &request.targets)),
                None => bail!("changelist requires a changelist name"),
            }
        }
        Action::Refresh => CommandPlan::Svn(status_args()),
        Action::Edit => bail!("edit runs in the foreground and has no svn command"),
    };
    Ok(plan)
}

fn submit_targets(request: &ActionRequest) -> Result<&[String]> {
    if request.targets.is_empty() {
        bail!("{} requires at least one checked file", request.action.label());
    }
    Ok(&request.targets)
}

fn single_target(request: &ActionRequest) -> Result<&str> {
    request
        .targets
        .first()
        .map(String::as_str)
        .with_context(|| format!("{} requires a target", request.action.label()))
}

fn os(value: &str) -> OsString {
    OsString::from(value)
}
