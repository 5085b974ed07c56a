use crate::command::CommandPlan;
use crate::config::{SessionConfig, clamp_list_width};
use crate::domain::{
    Action, ActionRequest, CommandResult, DiffText, SessionPhase, StatusCode, StatusEntry,
};
use crate::model::{Row, WorkingCopyModel};
use std::path::{Path, PathBuf};

const MAX_LOG_LINES: usize = 500;
const DETAIL_PLACEHOLDER_TITLE: &str = "Diff";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    List,
    Message,
    Detail,
    Log,
}

impl PaneFocus {
    pub fn next(self) -> Self {
        match self {
            Self::List => Self::Message,
            Self::Message => Self::Detail,
            Self::Detail => Self::Log,
            Self::Log => Self::List,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    PatchPath,
    ChangelistName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Help,
    ActionMenu {
        selected: usize,
    },
    ChangelistPicker {
        request: ActionRequest,
        selected: usize,
    },
    Confirm {
        request: ActionRequest,
    },
    Input {
        kind: InputKind,
        request: ActionRequest,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub enum BackendTask {
    Refresh,
    LoadDiff {
        target: String,
    },
    RunAction {
        request: ActionRequest,
        plan: CommandPlan,
    },
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    Refreshed {
        lines: Vec<String>,
    },
    DiffLoaded {
        target: String,
        diff: DiffText,
    },
    ActionFinished {
        request: ActionRequest,
        result: CommandResult,
    },
    ActionFailed {
        request: ActionRequest,
        message: String,
    },
    Error {
        context: String,
        message: String,
    },
}

pub struct App {
    pub config: SessionConfig,
    pub phase: SessionPhase,
    pub focus: PaneFocus,
    pub model: WorkingCopyModel,
    pub message: String,
    pub selected_index: usize,
    list_scroll: usize,
    pub detail_title: String,
    pub detail_text: String,
    pub detail_target: Option<String>,
    pub detail_scroll: usize,
    pub logs: Vec<String>,
    pub log_tail_offset: usize,
    pub modal: ModalState,
    in_flight: usize,
    pub pending_foreground: Option<ActionRequest>,
    pub should_quit: bool,
    pub watch_roots: Vec<PathBuf>,
    working_dir: PathBuf,
    rows: Vec<Row>,
}

impl App {
    pub fn new(config: SessionConfig, watch_roots: Vec<PathBuf>, working_dir: PathBuf) -> Self {
        let message = config.message.clone();
        Self {
            config,
            phase: SessionPhase::Empty,
            focus: PaneFocus::List,
            model: WorkingCopyModel::default(),
            message,
            selected_index: 0,
            list_scroll: 0,
            detail_title: DETAIL_PLACEHOLDER_TITLE.to_string(),
            detail_text: String::new(),
            detail_target: None,
            detail_scroll: 0,
            logs: Vec::new(),
            log_tail_offset: 0,
            modal: ModalState::None,
            in_flight: 0,
            pending_foreground: None,
            should_quit: false,
            watch_roots,
            working_dir,
            rows: Vec::new(),
        }
    }

    /// Hands the session state back for persisting.
    pub fn into_session(self) -> SessionConfig {
        SessionConfig {
            message: self.message,
            ..self.config
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn begin_task(&mut self) {
        self.in_flight += 1;
    }

    pub fn finish_task(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
        self.should_quit = true;
    }

    /// Replaces the model wholesale; prior checks are discarded.
    pub fn apply_status_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let previous = self.selected_entry().map(|entry| entry.path.clone());
        self.model = WorkingCopyModel::rebuild(lines, self.config.show_unversioned);
        self.rows = self.model.rows();
        if self.phase == SessionPhase::Empty {
            self.phase = SessionPhase::Populated;
        }

        if let Some(path) = previous
            && let Some(idx) = self.rows.iter().position(|row| {
                matches!(row, Row::Entry(i) if self.model.entries()[*i].path == path)
            })
        {
            self.selected_index = idx;
            return;
        }

        self.sync_selection_bounds();
        self.select_first_entry();
    }

    pub fn current_len(&self) -> usize {
        self.rows.len()
    }

    pub fn select_next(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = (self.selected_index + 1) % len;
    }

    pub fn select_prev(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = len - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    fn select_first_entry(&mut self) {
        if matches!(self.rows.get(self.selected_index), Some(Row::Header(_)))
            && matches!(self.rows.get(self.selected_index + 1), Some(Row::Entry(_)))
        {
            self.selected_index += 1;
        }
    }

    pub fn sync_selection_bounds(&mut self) {
        let len = self.current_len();
        if len == 0 {
            self.selected_index = 0;
            self.list_scroll = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    pub fn list_scroll(&self) -> usize {
        self.list_scroll
    }

    pub fn sync_list_scroll(&mut self, viewport_rows: usize) {
        let len = self.current_len();
        if len == 0 {
            self.list_scroll = 0;
            return;
        }

        let rows = viewport_rows.max(1);
        if self.selected_index < self.list_scroll {
            self.list_scroll = self.selected_index;
        } else if self.selected_index >= self.list_scroll + rows {
            self.list_scroll = self.selected_index + 1 - rows;
        }

        let max_offset = len.saturating_sub(rows);
        if self.list_scroll > max_offset {
            self.list_scroll = max_offset;
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected_index)
    }

    pub fn selected_entry_index(&self) -> Option<usize> {
        match self.selected_row()? {
            Row::Entry(index) => Some(*index),
            Row::Header(_) => None,
        }
    }

    pub fn selected_entry(&self) -> Option<&StatusEntry> {
        self.selected_entry_index()
            .and_then(|index| self.model.entry(index))
    }

    pub fn selected_status(&self) -> Option<StatusCode> {
        self.selected_entry().map(|entry| entry.status)
    }

    pub fn selected_path(&self) -> Option<String> {
        self.selected_entry().map(|entry| entry.path.clone())
    }

    /// Space on an entry toggles it; on a header it checks the whole
    /// changelist, or clears it when every member is already checked.
    pub fn toggle_selected_check(&mut self) -> bool {
        match self.selected_row().cloned() {
            Some(Row::Entry(index)) => self.model.toggle(index),
            Some(Row::Header(name)) => {
                let value = !self.model.changelist_fully_checked(&name);
                self.model.set_changelist_checked(&name, value) > 0
            }
            None => false,
        }
    }

    pub fn toggle_all_checks(&mut self) -> usize {
        let all_checked =
            !self.model.is_empty() && self.model.checked_count() == self.model.entries().len();
        self.model.set_all_checked(!all_checked)
    }

    /// Checked paths when there are any, otherwise the selected entry.
    pub fn action_targets(&self) -> Vec<String> {
        let checked: Vec<String> = self
            .model
            .checked_paths()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !checked.is_empty() {
            return checked;
        }
        self.selected_path().into_iter().collect()
    }

    pub fn status_label(&self) -> String {
        match self.model.checked_count() {
            0 => "No files selected.".to_string(),
            count => format!("{count} files selected."),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.model.checked_count() > 0 && !self.message.is_empty()
    }

    pub fn push_message_char(&mut self, c: char) {
        self.message.push(c);
    }

    pub fn pop_message_char(&mut self) -> bool {
        self.message.pop().is_some()
    }

    pub fn clear_message(&mut self) {
        self.message.clear();
    }

    pub fn menu_actions(&self) -> Vec<Action> {
        let status = self.selected_status();
        Action::MENU
            .into_iter()
            .filter(|action| action.applies_to(status))
            .collect()
    }

    pub fn open_action_menu(&mut self) {
        self.modal = ModalState::ActionMenu { selected: 0 };
    }

    pub fn open_confirm(&mut self, request: ActionRequest) {
        self.modal = ModalState::Confirm { request };
    }

    pub fn open_input(&mut self, kind: InputKind, request: ActionRequest, value: String) {
        self.modal = ModalState::Input {
            kind,
            request,
            value,
        };
    }

    pub fn open_changelist_picker(&mut self, request: ActionRequest) {
        self.modal = ModalState::ChangelistPicker {
            request,
            selected: 0,
        };
    }

    pub fn toggle_help(&mut self) {
        self.modal = match self.modal {
            ModalState::Help => ModalState::None,
            _ => ModalState::Help,
        };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }

    /// Known changelists followed by a slot for a new name.
    pub fn changelist_choices(&self) -> Vec<String> {
        let mut choices = self.model.changelists().to_vec();
        if !choices.iter().any(|name| name == crate::domain::DEFAULT_CHANGELIST) {
            choices.insert(0, crate::domain::DEFAULT_CHANGELIST.to_string());
        }
        choices
    }

    pub fn adjust_list_width(&mut self, delta: i16) -> bool {
        let before = self.config.list_width_percent;
        let next = before.saturating_add_signed(delta);
        self.config.list_width_percent = clamp_list_width(next);
        self.config.list_width_percent != before
    }

    pub fn toggle_show_unversioned(&mut self) -> bool {
        self.config.show_unversioned = !self.config.show_unversioned;
        self.config.show_unversioned
    }

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.log_tail_offset > 0 {
            self.log_tail_offset = self.log_tail_offset.saturating_add(1);
        }
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        let max = self.logs.len().saturating_sub(1);
        self.log_tail_offset = self.log_tail_offset.saturating_add(lines).min(max);
        self.log_tail_offset != before
    }

    pub fn scroll_log_down(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_sub(lines);
        self.log_tail_offset != before
    }

    pub fn scroll_detail_up(&mut self, lines: usize) -> bool {
        if self.detail_scroll == 0 {
            return false;
        }
        self.detail_scroll = self.detail_scroll.saturating_sub(lines);
        true
    }

    pub fn scroll_detail_down(&mut self, lines: usize) -> bool {
        let max = self.detail_text.lines().count().saturating_sub(1);
        if self.detail_scroll >= max {
            return false;
        }
        self.detail_scroll = (self.detail_scroll + lines).min(max);
        true
    }

    pub fn set_detail_diff(&mut self, target: &str, text: String) {
        self.detail_title = format!("Diff: {target}");
        self.detail_text = if text.trim().is_empty() {
            "(no textual changes)".to_string()
        } else {
            text
        };
        self.detail_target = Some(target.to_string());
        self.detail_scroll = 0;
    }

    pub fn clear_detail(&mut self) {
        self.detail_title = DETAIL_PLACEHOLDER_TITLE.to_string();
        self.detail_text.clear();
        self.detail_target = None;
        self.detail_scroll = 0;
    }

    pub fn format_row(&self, row: &Row) -> String {
        match row {
            Row::Header(name) => {
                let members = self
                    .model
                    .entries()
                    .iter()
                    .filter(|entry| &entry.changelist == name)
                    .count();
                format!("--- {name} ({members})")
            }
            Row::Entry(index) => self
                .model
                .entry(*index)
                .map(|entry| format!("  {entry}"))
                .unwrap_or_default(),
        }
    }

    pub fn current_items(&self) -> Vec<String> {
        self.rows.iter().map(|row| self.format_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: [&str; 5] = [
        "M       foo.txt",
        "?       bar.txt",
        "--- Changelist 'feature':",
        "A       baz.txt",
        "D       qux.txt",
    ];

    fn app() -> App {
        App::new(
            SessionConfig::default(),
            Vec::new(),
            std::env::temp_dir(),
        )
    }

    fn populated(show_unversioned: bool) -> App {
        let mut app = app();
        app.config.show_unversioned = show_unversioned;
        app.apply_status_lines(SAMPLE);
        app
    }

    #[test]
    fn first_refresh_populates_and_selects_first_entry() {
        let mut app = app();
        assert_eq!(app.phase, SessionPhase::Empty);
        app.apply_status_lines(SAMPLE);
        assert_eq!(app.phase, SessionPhase::Populated);
        assert_eq!(app.selected_index, 1);
        assert_eq!(app.selected_path().as_deref(), Some("foo.txt"));
    }

    #[test]
    fn items_show_headers_and_check_marks() {
        let mut app = populated(false);
        app.model.set_checked(0, true);
        assert_eq!(
            app.current_items(),
            vec![
                "--- default (1)",
                "  [x] M foo.txt",
                "--- feature (2)",
                "  [ ] A baz.txt",
                "  [ ] D qux.txt",
            ]
        );
    }

    #[test]
    fn refresh_keeps_selection_by_path_and_resets_checks() {
        let mut app = populated(false);
        app.selected_index = 4;
        assert!(app.toggle_selected_check());
        assert_eq!(app.model.checked_count(), 1);

        app.apply_status_lines(SAMPLE);
        assert_eq!(app.selected_path().as_deref(), Some("qux.txt"));
        assert_eq!(app.model.checked_count(), 0);
    }

    #[test]
    fn header_toggle_checks_and_clears_changelist() {
        let mut app = populated(false);
        app.selected_index = 2;
        assert!(app.selected_entry().is_none());

        assert!(app.toggle_selected_check());
        assert_eq!(app.model.checked_paths(), vec!["baz.txt", "qux.txt"]);
        assert!(app.toggle_selected_check());
        assert_eq!(app.model.checked_count(), 0);
    }

    #[test]
    fn toggle_all_flips_between_all_and_none() {
        let mut app = populated(true);
        assert_eq!(app.toggle_all_checks(), 4);
        assert_eq!(app.model.checked_count(), 4);
        assert_eq!(app.toggle_all_checks(), 4);
        assert_eq!(app.model.checked_count(), 0);
    }

    #[test]
    fn status_label_and_submit_enablement() {
        let mut app = populated(false);
        app.clear_message();
        assert_eq!(app.status_label(), "No files selected.");
        assert!(!app.can_submit());

        app.model.set_checked(0, true);
        app.model.set_checked(1, true);
        assert_eq!(app.status_label(), "2 files selected.");
        assert!(!app.can_submit());

        app.push_message_char('x');
        assert!(app.can_submit());
        assert!(app.pop_message_char());
        assert!(!app.can_submit());
    }

    #[test]
    fn action_targets_prefer_checked_entries() {
        let mut app = populated(false);
        assert_eq!(app.action_targets(), vec!["foo.txt"]);
        app.model.set_checked(2, true);
        app.model.set_checked(1, true);
        assert_eq!(app.action_targets(), vec!["baz.txt", "qux.txt"]);
    }

    #[test]
    fn menu_actions_depend_on_selected_status() {
        let mut app = populated(true);
        let modified = app.menu_actions();
        assert!(modified.contains(&Action::Revert));
        assert!(!modified.contains(&Action::Add));

        app.select_next();
        assert_eq!(app.selected_status(), Some(StatusCode::Unversioned));
        let unversioned = app.menu_actions();
        assert!(unversioned.contains(&Action::Add));
        assert!(unversioned.contains(&Action::Remove));
        assert!(!unversioned.contains(&Action::Revert));

        app.selected_index = 0;
        assert_eq!(app.menu_actions(), vec![Action::Refresh]);
    }

    #[test]
    fn changelist_choices_always_offer_default() {
        let app = populated(false);
        assert_eq!(
            app.changelist_choices(),
            vec!["default", "feature", "ignore-on-commit"]
        );

        let mut only_named = app;
        only_named.apply_status_lines(["--- Changelist 'x':", "M       a"]);
        assert_eq!(
            only_named.changelist_choices(),
            vec!["default", "x", "ignore-on-commit"]
        );
    }

    #[test]
    fn session_round_trip_carries_message_and_toggle() {
        let mut config = SessionConfig::default();
        config.message = "draft".to_string();
        let mut app = App::new(config, Vec::new(), PathBuf::from("/wc"));
        assert_eq!(app.message, "draft");

        app.push_message_char('!');
        app.toggle_show_unversioned();
        let session = app.into_session();
        assert_eq!(session.message, "draft!");
        assert!(session.show_unversioned);
    }

    #[test]
    fn list_width_is_bounded() {
        let mut app = app();
        app.config.list_width_percent = 78;
        assert!(app.adjust_list_width(5));
        assert_eq!(app.config.list_width_percent, 80);
        assert!(!app.adjust_list_width(5));
        app.config.list_width_percent = 21;
        assert!(app.adjust_list_width(-5));
        assert_eq!(app.config.list_width_percent, 20);
    }

    #[test]
    fn busy_tracks_queued_tasks() {
        let mut app = app();
        assert!(!app.is_busy());
        app.begin_task();
        app.begin_task();
        app.finish_task();
        assert!(app.is_busy());
        app.finish_task();
        app.finish_task();
        assert!(!app.is_busy());
    }

    #[test]
    fn empty_diff_shows_placeholder() {
        let mut app = app();
        app.set_detail_diff("a.txt", "  \n".to_string());
        assert_eq!(app.detail_title, "Diff: a.txt");
        assert_eq!(app.detail_text, "(no textual changes)");
        app.clear_detail();
        assert!(app.detail_target.is_none());
    }

    #[test]
    fn detail_scroll_is_clamped() {
        let mut app = app();
        app.set_detail_diff("x", "a\nb\nc\nd\ne".to_string());
        assert!(app.scroll_detail_down(2));
        assert_eq!(app.detail_scroll, 2);
        assert!(app.scroll_detail_down(100));
        assert_eq!(app.detail_scroll, 4);
        assert!(!app.scroll_detail_down(1));
        assert!(app.scroll_detail_up(3));
        assert_eq!(app.detail_scroll, 1);
        assert!(app.scroll_detail_up(10));
        assert!(!app.scroll_detail_up(1));
    }

    #[test]
    fn log_is_bounded_and_keeps_manual_scroll() {
        let mut app = app();
        for i in 0..MAX_LOG_LINES + 10 {
            app.log(format!("line-{i}"));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs[0], "line-10");

        assert!(app.scroll_log_up(4));
        app.log("late".to_string());
        assert_eq!(app.log_tail_offset, 5);
        assert!(app.scroll_log_down(10));
        assert_eq!(app.log_tail_offset, 0);
    }

    #[test]
    fn list_scroll_moves_only_at_view_edges() {
        let mut app = app();
        let lines: Vec<String> = (0..20).map(|i| format!("M       file-{i}")).collect();
        app.apply_status_lines(lines);

        app.selected_index = 10;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 6);

        app.selected_index = 6;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 6);

        app.selected_index = 5;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 5);
    }
}
