use crate::app::{App, BackendTask, InputKind};
use crate::command::plan_for;
use crate::domain::{Action, ActionRequest, CommandResult};
use crate::terminal::{Tui, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn send_task(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: BackendTask,
) -> Result<()> {
    app.begin_task();
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))
}

pub(crate) fn request_refresh(app: &mut App, task_tx: &UnboundedSender<BackendTask>) -> Result<()> {
    send_task(app, task_tx, BackendTask::Refresh)
}

/// Request for an action picked from the per-entry menu, or `None` when the
/// selection has nothing to act on.
pub(crate) fn build_menu_request(app: &App, action: Action) -> Option<ActionRequest> {
    match action {
        Action::Refresh => Some(ActionRequest::new(action)),
        Action::Changelist => {
            let targets = app.action_targets();
            if targets.is_empty() {
                return None;
            }
            Some(ActionRequest {
                targets,
                ..ActionRequest::new(action)
            })
        }
        _ => app
            .selected_path()
            .map(|path| ActionRequest::with_target(action, path)),
    }
}

/// Collects whatever the request still lacks (a confirmation, a file name, a
/// changelist) before running it.
pub(crate) fn dispatch_action_request(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: ActionRequest,
) -> Result<()> {
    match request.action {
        Action::Refresh => return request_refresh(app, task_tx),
        Action::Diff => {
            let Some(target) = request.targets.first().cloned() else {
                app.log("diff requires a target".to_string());
                return Ok(());
            };
            return send_task(app, task_tx, BackendTask::LoadDiff { target });
        }
        Action::Changelist if request.changelist.is_none() => {
            app.open_changelist_picker(request);
            return Ok(());
        }
        Action::CreatePatch if request.output.is_none() => {
            let suggested = app.config.patch_file.clone();
            app.open_input(InputKind::PatchPath, request, suggested);
            return Ok(());
        }
        action if action.is_dangerous() && app.config.confirm_remove => {
            app.open_confirm(request);
            return Ok(());
        }
        _ => {}
    }
    execute_action_request(app, task_tx, request)
}

pub(crate) fn execute_action_request(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: ActionRequest,
) -> Result<()> {
    if request.action == Action::Edit {
        app.pending_foreground = Some(request);
        return Ok(());
    }

    match plan_for(&request, app.working_dir()) {
        Ok(plan) => {
            app.log(format!(
                "run {} {}",
                request.action.label(),
                request.target_label()
            ));
            send_task(app, task_tx, BackendTask::RunAction { request, plan })
        }
        Err(err) => {
            app.log(format!("{} not started: {err:#}", request.action.label()));
            Ok(())
        }
    }
}

/// Commit or patch the checked entries. Refused while nothing is checked or
/// the message is empty.
pub(crate) fn submit(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    action: Action,
) -> Result<()> {
    if !action.is_submit() {
        return Ok(());
    }
    if !app.can_submit() {
        app.log(format!(
            "{} needs a commit message and at least one checked file",
            action.label()
        ));
        return Ok(());
    }

    let request = ActionRequest {
        targets: app
            .model
            .checked_paths()
            .into_iter()
            .map(str::to_string)
            .collect(),
        message: Some(app.message.clone()),
        ..ActionRequest::new(action)
    };
    dispatch_action_request(app, task_tx, request)
}

/// Applies the outcome of an action that ran in the worker.
pub(crate) fn finish_action(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: ActionRequest,
    outcome: std::result::Result<CommandResult, String>,
) -> Result<()> {
    let succeeded = match &outcome {
        Ok(result) => {
            app.log(format!(
                "{} {} exit={} duration={}ms",
                request.action.label(),
                request.target_label(),
                result.exit_code,
                result.duration_ms
            ));
            if !result.stderr.trim().is_empty() {
                app.log(format!("stderr: {}", squash_lines(&result.stderr)));
            }
            result.success()
        }
        Err(message) => {
            app.log(format!(
                "error[{}]: {} {message}",
                request.action.label(),
                request.target_label()
            ));
            false
        }
    };

    if !request.action.is_submit() {
        return request_refresh(app, task_tx);
    }

    if succeeded {
        match request.action {
            Action::Commit => app.clear_message(),
            Action::CreatePatch => {
                if let Some(output) = &request.output {
                    app.config.patch_file = output.display().to_string();
                    app.log(format!("patch written to {}", output.display()));
                }
            }
            _ => {}
        }
        if app.config.close_after_submit {
            app.close();
            return Ok(());
        }
        return request_refresh(app, task_tx);
    }

    if !app.config.report_failures {
        app.close();
    }
    Ok(())
}

pub(crate) fn resolve_patch_path(working_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        path
    } else {
        working_dir.join(path)
    }
}

pub(crate) fn run_foreground_action(
    terminal: &mut Tui,
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    request: ActionRequest,
) -> Result<()> {
    restore_terminal(terminal)?;

    let result = run_editor_foreground(app.working_dir(), &request);

    setup_terminal()?;
    terminal.clear()?;

    match result {
        Ok((code, elapsed)) => app.log(format!(
            "{} {} exit={} duration={}ms",
            request.action.label(),
            request.target_label(),
            code,
            elapsed
        )),
        Err(err) => app.log(format!("foreground action error: {err:#}")),
    }

    request_refresh(app, task_tx)
}

fn run_editor_foreground(working_dir: &Path, request: &ActionRequest) -> Result<(i32, u64)> {
    let target = request
        .targets
        .first()
        .context("edit requires a target")?;
    let started = Instant::now();
    let status = Command::new("sh")
        .current_dir(working_dir)
        .arg("-c")
        .arg("${VISUAL:-${EDITOR:-vi}} \"$1\"")
        .arg("sh")
        .arg(target)
        .status()
        .with_context(|| format!("failed to launch editor for {target}"))?;
    let elapsed = started.elapsed().as_millis() as u64;

    Ok((status.code().unwrap_or(-1), elapsed))
}

pub(crate) fn squash_lines(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
        .collect::<Vec<_>>()
        .join(" | ")
}
