use crate::actions::{
    build_menu_request, dispatch_action_request, execute_action_request, finish_action,
    request_refresh, resolve_patch_path, submit,
};
use crate::app::{App, BackendEvent, BackendTask, InputKind, ModalState, PaneFocus};
use crate::domain::{Action, ActionRequest};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

const PAGE: usize = 20;
const WIDTH_STEP: i16 = 5;

pub(crate) fn handle_backend_event(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    event: BackendEvent,
) -> Result<()> {
    app.finish_task();

    match event {
        BackendEvent::Refreshed { lines } => {
            app.apply_status_lines(lines);
            let stale = app
                .detail_target
                .as_deref()
                .is_some_and(|target| !app.model.entries().iter().any(|e| e.path == target));
            if stale {
                app.clear_detail();
            }
        }
        BackendEvent::DiffLoaded { target, diff } => {
            app.set_detail_diff(&target, diff.text);
        }
        BackendEvent::ActionFinished { request, result } => {
            finish_action(app, task_tx, request, Ok(result))?;
        }
        BackendEvent::ActionFailed { request, message } => {
            finish_action(app, task_tx, request, Err(message))?;
        }
        BackendEvent::Error { context, message } => {
            app.log(format!("error[{context}]: {message}"));
        }
    }

    Ok(())
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.close();
        return Ok(());
    }

    match app.modal {
        ModalState::None => match app.focus {
            PaneFocus::Message => handle_message_key(app, key),
            _ => handle_key_without_modal(app, key, task_tx),
        },
        ModalState::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.close_modal();
            }
            Ok(())
        }
        ModalState::ActionMenu { .. } => handle_action_menu_key(app, key, task_tx),
        ModalState::ChangelistPicker { .. } => handle_changelist_picker_key(app, key, task_tx),
        ModalState::Confirm { .. } => handle_confirm_key(app, key, task_tx),
        ModalState::Input { .. } => handle_input_key(app, key, task_tx),
    }
}

fn plain(key: &KeyEvent) -> bool {
    !key.modifiers.contains(KeyModifiers::CONTROL)
        && !key.modifiers.contains(KeyModifiers::ALT)
        && !key.modifiers.contains(KeyModifiers::SUPER)
}

fn handle_message_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => app.focus = PaneFocus::List,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Enter => app.push_message_char('\n'),
        KeyCode::Backspace => {
            app.pop_message_char();
        }
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => app.clear_message(),
        KeyCode::Char(c) if plain(&key) => app.push_message_char(c),
        _ => {}
    }
    Ok(())
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.close(),
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Esc => app.focus = PaneFocus::List,
        KeyCode::Char('r') => request_refresh(app, task_tx)?,
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            PaneFocus::Detail => {
                app.scroll_detail_down(1);
            }
            PaneFocus::Log => {
                app.scroll_log_down(1);
            }
            _ => app.select_next(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            PaneFocus::Detail => {
                app.scroll_detail_up(1);
            }
            PaneFocus::Log => {
                app.scroll_log_up(1);
            }
            _ => app.select_prev(),
        },
        KeyCode::PageDown => scroll_focused(app, PAGE, true),
        KeyCode::PageUp => scroll_focused(app, PAGE, false),
        KeyCode::Char('d') if key.modifiers == KeyModifiers::CONTROL => {
            scroll_focused(app, PAGE, true);
        }
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => {
            scroll_focused(app, PAGE, false);
        }
        _ if app.focus == PaneFocus::List => handle_list_key(app, key, task_tx)?,
        _ => {}
    }
    Ok(())
}

fn scroll_focused(app: &mut App, lines: usize, down: bool) {
    match (app.focus, down) {
        (PaneFocus::Detail, true) => {
            app.scroll_detail_down(lines);
        }
        (PaneFocus::Detail, false) => {
            app.scroll_detail_up(lines);
        }
        (PaneFocus::Log, true) => {
            app.scroll_log_down(lines);
        }
        (PaneFocus::Log, false) => {
            app.scroll_log_up(lines);
        }
        _ => {}
    }
}

fn handle_list_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match key.code {
        KeyCode::Char(' ') => {
            app.toggle_selected_check();
        }
        KeyCode::Char('A') => {
            app.toggle_all_checks();
        }
        KeyCode::Enter | KeyCode::Char('d') => {
            if Action::Diff.applies_to(app.selected_status())
                && let Some(request) = build_menu_request(app, Action::Diff)
            {
                dispatch_action_request(app, task_tx, request)?;
            } else {
                app.clear_detail();
            }
        }
        KeyCode::Char('u') => {
            let shown = app.toggle_show_unversioned();
            app.log(format!(
                "unversioned files {}",
                if shown { "shown" } else { "hidden" }
            ));
            request_refresh(app, task_tx)?;
        }
        KeyCode::Char('m') | KeyCode::Char('a') => app.open_action_menu(),
        KeyCode::Char('c') => submit(app, task_tx, Action::Commit)?,
        KeyCode::Char('p') => submit(app, task_tx, Action::CreatePatch)?,
        KeyCode::Char('e') => {
            if Action::Edit.applies_to(app.selected_status())
                && let Some(request) = build_menu_request(app, Action::Edit)
            {
                execute_action_request(app, task_tx, request)?;
            } else {
                app.log("edit requires an existing file".to_string());
            }
        }
        KeyCode::Char('i') => app.focus = PaneFocus::Message,
        KeyCode::Char('<') => {
            app.adjust_list_width(-WIDTH_STEP);
        }
        KeyCode::Char('>') => {
            app.adjust_list_width(WIDTH_STEP);
        }
        _ => {}
    }
    Ok(())
}

fn handle_action_menu_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let actions = app.menu_actions();
    let mut chosen: Option<Action> = None;

    {
        let ModalState::ActionMenu { selected } = &mut app.modal else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                app.close_modal();
                return Ok(());
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !actions.is_empty() {
                    *selected = (*selected + 1) % actions.len();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !actions.is_empty() {
                    *selected = selected.checked_sub(1).unwrap_or(actions.len() - 1);
                }
            }
            KeyCode::Enter => chosen = actions.get(*selected).copied(),
            _ => {}
        }
    }

    if let Some(action) = chosen {
        app.close_modal();
        match build_menu_request(app, action) {
            Some(request) => dispatch_action_request(app, task_tx, request)?,
            None => app.log(format!("{} requires a target file", action.label())),
        }
    }

    Ok(())
}

fn handle_changelist_picker_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let choices = app.changelist_choices();
    // One extra slot after the known names for typing a new one.
    let slots = choices.len() + 1;
    let mut picked: Option<(ActionRequest, Option<String>)> = None;

    {
        let ModalState::ChangelistPicker { request, selected } = &mut app.modal else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                app.close_modal();
                return Ok(());
            }
            KeyCode::Down | KeyCode::Char('j') => *selected = (*selected + 1) % slots,
            KeyCode::Up | KeyCode::Char('k') => {
                *selected = selected.checked_sub(1).unwrap_or(slots - 1);
            }
            KeyCode::Enter => picked = Some((request.clone(), choices.get(*selected).cloned())),
            _ => {}
        }
    }

    match picked {
        Some((request, Some(name))) => {
            app.close_modal();
            let request = ActionRequest {
                changelist: Some(name),
                ..request
            };
            dispatch_action_request(app, task_tx, request)?;
        }
        Some((request, None)) => {
            app.open_input(InputKind::ChangelistName, request, String::new());
        }
        None => {}
    }

    Ok(())
}

fn handle_confirm_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let ModalState::Confirm { request } = &app.modal else {
        return Ok(());
    };
    let request = request.clone();

    match key.code {
        KeyCode::Enter | KeyCode::Char('y') => {
            app.close_modal();
            execute_action_request(app, task_tx, request)?;
        }
        KeyCode::Esc | KeyCode::Char('n') => {
            app.close_modal();
            app.log(format!("{} canceled", request.action.label()));
        }
        _ => {}
    }

    Ok(())
}

fn handle_input_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let working_dir = app.working_dir().to_path_buf();
    let mut ready_request: Option<ActionRequest> = None;
    let mut pending_log: Option<&str> = None;

    {
        let ModalState::Input {
            kind,
            request,
            value,
        } = &mut app.modal
        else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                app.close_modal();
                return Ok(());
            }
            KeyCode::Enter => {
                let trimmed = value.trim();
                match kind {
                    InputKind::PatchPath if trimmed.is_empty() => {
                        pending_log = Some("Please enter a patch file name");
                    }
                    InputKind::PatchPath => {
                        ready_request = Some(ActionRequest {
                            output: Some(resolve_patch_path(&working_dir, trimmed)),
                            ..request.clone()
                        });
                    }
                    InputKind::ChangelistName if trimmed.is_empty() => {
                        pending_log = Some("Please enter a changelist name");
                    }
                    InputKind::ChangelistName => {
                        ready_request = Some(ActionRequest {
                            changelist: Some(trimmed.to_string()),
                            ..request.clone()
                        });
                    }
                }
            }
            KeyCode::Backspace => {
                value.pop();
            }
            KeyCode::Char(c) if plain(&key) => value.push(c),
            _ => {}
        }
    }

    if let Some(line) = pending_log {
        app.log(line.to_string());
    }

    if let Some(request) = ready_request {
        app.close_modal();
        dispatch_action_request(app, task_tx, request)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandPlan;
    use crate::config::SessionConfig;
    use crate::domain::{CommandResult, DiffText, SessionPhase};
    use pretty_assertions::assert_eq;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use tokio::sync::mpsc;

    const SAMPLE: [&str; 4] = [
        "M       a.txt",
        "?       new.rs",
        "--- Changelist 'feature':",
        "A       b.txt",
    ];

    fn populated() -> App {
        let mut config = SessionConfig::default();
        config.show_unversioned = true;
        let mut app = App::new(config, Vec::new(), PathBuf::from("/wc"));
        app.apply_status_lines(SAMPLE);
        app
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str, task_tx: &UnboundedSender<BackendTask>) {
        for c in text.chars() {
            handle_key_event(app, press(KeyCode::Char(c)), task_tx).expect("type");
        }
    }

    #[test]
    fn question_key_toggles_help() {
        let mut app = populated();
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('?')), &task_tx).expect("handle key");
        assert_eq!(app.modal, ModalState::Help);

        handle_key_event(&mut app, press(KeyCode::Char('?')), &task_tx).expect("handle key");
        assert_eq!(app.modal, ModalState::None);
    }

    #[test]
    fn ctrl_c_closes_even_while_typing() {
        let mut app = populated();
        app.focus = PaneFocus::Message;
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &task_tx,
        )
        .expect("handle key");

        assert!(app.should_quit);
        assert_eq!(app.phase, SessionPhase::Closed);
        assert!(app.message.is_empty());
    }

    #[test]
    fn message_pane_captures_plain_keys() {
        let mut app = populated();
        let (task_tx, _task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('i')), &task_tx).expect("focus");
        type_text(&mut app, "qc", &task_tx);
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("newline");
        type_text(&mut app, "x", &task_tx);
        handle_key_event(&mut app, press(KeyCode::Backspace), &task_tx).expect("backspace");

        assert_eq!(app.message, "qc\n");
        assert!(!app.should_quit);

        handle_key_event(&mut app, press(KeyCode::Esc), &task_tx).expect("leave");
        assert_eq!(app.focus, PaneFocus::List);
    }

    #[test]
    fn space_checks_and_commit_key_submits() {
        let mut app = populated();
        app.message = "Fix".to_string();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char(' ')), &task_tx).expect("check");
        assert_eq!(app.status_label(), "1 files selected.");

        handle_key_event(&mut app, press(KeyCode::Char('c')), &task_tx).expect("commit");

        let Ok(BackendTask::RunAction { plan, .. }) = task_rx.try_recv() else {
            panic!("expected a queued commit");
        };
        let expected: Vec<OsString> = ["commit", "-N", "-m", "Fix", "a.txt"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(plan, CommandPlan::Svn(expected));
    }

    #[test]
    fn enter_on_entry_loads_diff_and_on_header_clears_detail() {
        let mut app = populated();
        app.set_detail_diff("old", "x".to_string());
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("diff");
        assert!(matches!(
            task_rx.try_recv(),
            Ok(BackendTask::LoadDiff { target }) if target == "a.txt"
        ));

        app.selected_index = 0;
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("header");
        assert!(task_rx.try_recv().is_err());
        assert!(app.detail_target.is_none());
    }

    #[test]
    fn unversioned_toggle_refreshes() {
        let mut app = populated();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('u')), &task_tx).expect("toggle");

        assert!(!app.config.show_unversioned);
        assert!(matches!(task_rx.try_recv(), Ok(BackendTask::Refresh)));
    }

    #[test]
    fn action_menu_runs_filtered_action() {
        let mut app = populated();
        app.select_next();
        assert_eq!(app.selected_path().as_deref(), Some("new.rs"));
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('m')), &task_tx).expect("menu");
        assert_eq!(app.menu_actions(), vec![Action::Add, Action::Remove, Action::Edit, Action::Refresh]);
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("choose");

        assert_eq!(app.modal, ModalState::None);
        let Ok(BackendTask::RunAction { request, plan }) = task_rx.try_recv() else {
            panic!("expected a queued add");
        };
        assert_eq!(request.action, Action::Add);
        assert_eq!(
            plan,
            CommandPlan::Svn(vec![OsString::from("add"), OsString::from("new.rs")])
        );
    }

    #[test]
    fn remove_goes_through_confirmation() {
        let mut app = populated();
        app.open_confirm(ActionRequest::with_target(Action::Remove, "new.rs"));
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('n')), &task_tx).expect("cancel");
        assert_eq!(app.modal, ModalState::None);
        assert!(task_rx.try_recv().is_err());

        app.open_confirm(ActionRequest::with_target(Action::Remove, "new.rs"));
        handle_key_event(&mut app, press(KeyCode::Char('y')), &task_tx).expect("confirm");
        assert!(matches!(
            task_rx.try_recv(),
            Ok(BackendTask::RunAction { plan: CommandPlan::DeletePath(path), .. })
                if path == Path::new("/wc/new.rs")
        ));
    }

    #[test]
    fn changelist_picker_moves_to_existing_or_new_list() {
        let mut app = populated();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();
        let request = ActionRequest::with_target(Action::Changelist, "a.txt");

        app.open_changelist_picker(request.clone());
        handle_key_event(&mut app, press(KeyCode::Down), &task_tx).expect("down");
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("pick");
        let Ok(BackendTask::RunAction { plan, .. }) = task_rx.try_recv() else {
            panic!("expected changelist move");
        };
        let expected: Vec<OsString> = ["changelist", "feature", "a.txt"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(plan, CommandPlan::Svn(expected));

        app.open_changelist_picker(request);
        handle_key_event(&mut app, press(KeyCode::Up), &task_tx).expect("wrap");
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("new slot");
        assert!(matches!(
            app.modal,
            ModalState::Input { kind: InputKind::ChangelistName, .. }
        ));
        type_text(&mut app, "later", &task_tx);
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("submit name");
        let Ok(BackendTask::RunAction { plan, .. }) = task_rx.try_recv() else {
            panic!("expected changelist move");
        };
        let expected: Vec<OsString> = ["changelist", "later", "a.txt"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(plan, CommandPlan::Svn(expected));
    }

    #[test]
    fn patch_input_resolves_file_and_queues_diff() {
        let mut app = populated();
        app.message = "wip".to_string();
        app.model.set_checked(0, true);
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char('p')), &task_tx).expect("patch");
        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("accept");

        let Ok(BackendTask::RunAction { plan, .. }) = task_rx.try_recv() else {
            panic!("expected a queued patch");
        };
        let CommandPlan::SvnToFile { args, output } = plan else {
            panic!("patch must stream into a file");
        };
        assert_eq!(output, PathBuf::from("/wc/changes.patch"));
        assert_eq!(args.last(), Some(&OsString::from("a.txt")));
    }

    #[test]
    fn patch_keeps_selection_when_refresh_lands_during_prompt() {
        let mut app = populated();
        app.message = "wip".to_string();
        app.selected_index = 4;
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();

        handle_key_event(&mut app, press(KeyCode::Char(' ')), &task_tx).expect("check");
        assert_eq!(app.model.checked_paths(), vec!["b.txt"]);
        handle_key_event(&mut app, press(KeyCode::Char('p')), &task_tx).expect("patch");

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::Refreshed {
                lines: SAMPLE.iter().map(|line| line.to_string()).collect(),
            },
        )
        .expect("refresh event");
        assert_eq!(app.model.checked_count(), 0);

        handle_key_event(&mut app, press(KeyCode::Enter), &task_tx).expect("accept");

        let Ok(BackendTask::RunAction { request, plan }) = task_rx.try_recv() else {
            panic!("expected a queued patch");
        };
        assert_eq!(request.targets, vec!["b.txt"]);
        let CommandPlan::SvnToFile { args, .. } = plan else {
            panic!("patch must stream into a file");
        };
        let expected: Vec<OsString> = ["diff", "-N", "-x", "--ignore-eol-style", "b.txt"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn backend_events_release_busy_and_update_state() {
        let mut app = populated();
        let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackendTask>();
        app.begin_task();

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::DiffLoaded {
                target: "a.txt".to_string(),
                diff: DiffText {
                    text: "+x\n".to_string(),
                },
            },
        )
        .expect("diff event");
        assert!(!app.is_busy());
        assert_eq!(app.detail_target.as_deref(), Some("a.txt"));

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::ActionFinished {
                request: ActionRequest::with_target(Action::Revert, "a.txt"),
                result: CommandResult {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: 1,
                },
            },
        )
        .expect("action event");
        assert!(matches!(task_rx.try_recv(), Ok(BackendTask::Refresh)));

        handle_backend_event(
            &mut app,
            &task_tx,
            BackendEvent::Refreshed {
                lines: vec!["?       new.rs".to_string()],
            },
        )
        .expect("refresh event");
        assert!(app.detail_target.is_none());
        assert!(!app.is_busy());
    }
}
