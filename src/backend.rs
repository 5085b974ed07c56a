use crate::app::{BackendEvent, BackendTask};
use crate::command::diff_args;
use crate::domain::DiffText;
use crate::error::SvnError;
use crate::infra::{SvnClient, command_failed, execute_plan};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Drains tasks one at a time, so at most one svn process runs at once.
pub(crate) async fn worker_loop(
    client: Arc<dyn SvnClient>,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        let event = run_task(client.clone(), task).await;
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn run_task(client: Arc<dyn SvnClient>, task: BackendTask) -> BackendEvent {
    match task {
        BackendTask::Refresh => {
            let result = tokio::task::spawn_blocking(move || client.status()).await;
            match result {
                Ok(Ok(lines)) => BackendEvent::Refreshed { lines },
                other => BackendEvent::Error {
                    context: "refresh".to_string(),
                    message: format!("status failed: {}", flatten_error(other)),
                },
            }
        }
        BackendTask::LoadDiff { target } => {
            let args = diff_args(&target);
            let result = tokio::task::spawn_blocking(move || -> Result<DiffText, SvnError> {
                let result = client.run(&args)?;
                if result.success() {
                    Ok(DiffText {
                        text: result.stdout,
                    })
                } else {
                    Err(command_failed(&args, result))
                }
            })
            .await;
            match result {
                Ok(Ok(diff)) => BackendEvent::DiffLoaded { target, diff },
                other => BackendEvent::Error {
                    context: "diff".to_string(),
                    message: format!("diff failed: {}", flatten_error(other)),
                },
            }
        }
        BackendTask::RunAction { request, plan } => {
            let result =
                tokio::task::spawn_blocking(move || execute_plan(client.as_ref(), &plan)).await;
            match result {
                Ok(Ok(result)) => BackendEvent::ActionFinished { request, result },
                other => BackendEvent::ActionFailed {
                    request,
                    message: flatten_error(other),
                },
            }
        }
    }
}

fn flatten_error<T>(
    res: std::result::Result<Result<T, SvnError>, tokio::task::JoinError>,
) -> String {
    match res {
        Ok(Ok(_)) => "ok".to_string(),
        Ok(Err(err)) => err.to_string(),
        Err(err) => format!("join error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandPlan;
    use crate::domain::{Action, ActionRequest};
    use crate::infra::fake::FakeSvnClient;
    use std::ffi::OsString;
    use tokio::sync::mpsc;

    #[test]
    fn flatten_error_formats_all_cases() {
        let ok = flatten_error::<()>(Ok(Ok(())));
        assert_eq!(ok, "ok");

        let err = flatten_error::<()>(Ok(Err(SvnError::CommandFailed {
            subcommand: "commit".to_string(),
            exit_code: 1,
            stderr: "boom".to_string(),
        })));
        assert!(err.contains("boom"));
    }

    #[tokio::test]
    async fn refresh_task_yields_status_lines() {
        let client = Arc::new(FakeSvnClient {
            status_stdout: "M       a.txt\n".to_string(),
            ..FakeSvnClient::default()
        });
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        task_tx.send(BackendTask::Refresh).expect("send");
        drop(task_tx);

        worker_loop(client, task_rx, event_tx).await;

        let event = event_rx.recv().await.expect("event");
        assert!(matches!(
            event,
            BackendEvent::Refreshed { lines } if lines == vec!["M       a.txt".to_string()]
        ));
    }

    #[tokio::test]
    async fn failed_status_becomes_error_event() {
        let client: Arc<dyn SvnClient> = Arc::new(FakeSvnClient {
            exit_code: 1,
            stderr: "not a working copy".to_string(),
            ..FakeSvnClient::default()
        });
        let event = run_task(client, BackendTask::Refresh).await;
        assert!(matches!(
            event,
            BackendEvent::Error { context, message }
                if context == "refresh" && message.contains("not a working copy")
        ));
    }

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let client = Arc::new(FakeSvnClient::default());
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let request = ActionRequest::with_target(Action::Revert, "a.txt");
        task_tx
            .send(BackendTask::RunAction {
                request: request.clone(),
                plan: CommandPlan::Svn(vec![OsString::from("revert"), OsString::from("a.txt")]),
            })
            .expect("send");
        task_tx
            .send(BackendTask::LoadDiff {
                target: "b.txt".to_string(),
            })
            .expect("send");
        drop(task_tx);

        worker_loop(client.clone(), task_rx, event_tx).await;

        assert!(matches!(
            event_rx.recv().await,
            Some(BackendEvent::ActionFinished { request: got, .. }) if got == request
        ));
        assert!(matches!(
            event_rx.recv().await,
            Some(BackendEvent::DiffLoaded { target, .. }) if target == "b.txt"
        ));

        let calls = client.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0], "revert");
        assert_eq!(calls[1][0], "diff");
    }

    #[tokio::test]
    async fn failed_delete_becomes_action_failed() {
        let client: Arc<dyn SvnClient> = Arc::new(FakeSvnClient::default());
        let request = ActionRequest::with_target(Action::Remove, "missing");
        let missing = std::env::temp_dir().join(format!(
            "svn_commit_tui_backend_missing_{}",
            std::process::id()
        ));
        let event = run_task(
            client,
            BackendTask::RunAction {
                request,
                plan: CommandPlan::DeletePath(missing),
            },
        )
        .await;
        assert!(matches!(
            event,
            BackendEvent::ActionFailed { message, .. } if message.contains("failed to remove")
        ));
    }
}
