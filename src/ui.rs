use crate::app::{App, InputKind, ModalState, PaneFocus};
use crate::domain::Action;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

const MESSAGE_HEIGHT: u16 = 7;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let list_width = app.config.list_width_percent;
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(list_width),
            Constraint::Percentage(100u16.saturating_sub(list_width)),
        ])
        .split(outer[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(MESSAGE_HEIGHT),
            Constraint::Percentage(25),
        ])
        .split(main[1]);

    draw_list(frame, app, main[0]);
    draw_detail(frame, app, right[0]);
    draw_message(frame, app, right[1]);
    draw_logs(frame, app, right[2]);
    draw_status_bar(frame, app, outer[1]);
    draw_modal(frame, app);
}

fn focus_style(app: &App, pane: PaneFocus) -> Style {
    if app.focus == pane {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn draw_list(frame: &mut Frame, app: &mut App, area: Rect) {
    app.sync_list_scroll(area.height.saturating_sub(2) as usize);

    let items: Vec<ListItem> = app
        .current_items()
        .into_iter()
        .map(|item| {
            if item.starts_with("---") {
                ListItem::new(item).style(
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ListItem::new(item)
            }
        })
        .collect();

    let title = if app.model.is_empty() {
        " Changes (none) ".to_string()
    } else {
        format!(" Changes ({}) ", app.model.entries().len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(app, PaneFocus::List)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default().with_offset(app.list_scroll());
    if app.current_len() > 0 {
        state.select(Some(app.selected_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let lines = if app.detail_text.trim().is_empty() {
        let mut lines = vec![
            Line::from("No diff loaded."),
            Line::from("Enter / d: diff of the selected entry"),
        ];
        if let Some(entry) = app.selected_entry() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                entry.raw_line.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    } else {
        colorized_diff_lines(&app.detail_text)
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" {} ", app.detail_title))
                .borders(Borders::ALL)
                .border_style(focus_style(app, PaneFocus::Detail)),
        )
        .scroll((app.detail_scroll.min(u16::MAX as usize) as u16, 0))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_message(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.focus == PaneFocus::Message;
    let mut text = app.message.clone();
    if editing {
        text.push('_');
    }

    let lines: Vec<Line> = if app.message.is_empty() && !editing {
        vec![Line::from(Span::styled(
            "i: write a commit message",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        text.split('\n').map(|line| Line::from(line.to_string())).collect()
    };

    // Keep the cursor line visible once the message outgrows the pane.
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible.max(1));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Message ")
                .borders(Borders::ALL)
                .border_style(focus_style(app, PaneFocus::Message)),
        )
        .scroll((scroll.min(u16::MAX as usize) as u16, 0))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log_window(&app.logs, app.log_tail_offset, visible)
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let title = if app.log_tail_offset > 0 {
        format!(" Log (-{}) ", app.log_tail_offset)
    } else {
        " Log ".to_string()
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(app, PaneFocus::Log)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

/// The `height` lines ending `tail_offset` lines before the newest one.
fn log_window(logs: &[String], tail_offset: usize, height: usize) -> &[String] {
    let end = logs.len().saturating_sub(tail_offset);
    let start = end.saturating_sub(height);
    &logs[start..end]
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let busy = app.is_busy();
    let submit_style = if app.can_submit() {
        Style::default().fg(Color::LightGreen)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", if busy { "BUSY" } else { "IDLE" }),
            if busy {
                Style::default().bg(Color::Yellow).fg(Color::Black)
            } else {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            },
        ),
        Span::raw("  "),
        Span::raw(app.status_label()),
        Span::raw("  "),
        Span::styled("c:commit p:patch", submit_style),
        Span::raw("  "),
        Span::styled(
            if app.config.show_unversioned {
                "u:unversioned shown"
            } else {
                "u:unversioned hidden"
            },
            Style::default().fg(Color::Gray),
        ),
    ];

    if !app.watch_roots.is_empty() {
        let roots: Vec<String> = app
            .watch_roots
            .iter()
            .map(|root| root.display().to_string())
            .collect();
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("roots: {}", roots.join(", ")),
            Style::default().fg(Color::Gray),
        ));
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled("?:help", Style::default().fg(Color::Gray)));

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match &app.modal {
        ModalState::None => {}
        ModalState::Help => {
            let area = centered_rect(60, 70, frame.area());
            frame.render_widget(Clear, area);
            let lines: Vec<Line> = HELP_LINES.iter().map(|line| Line::from(*line)).collect();
            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Keys ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        ModalState::ActionMenu { selected } => {
            let actions = app.menu_actions();
            let title = match app.selected_path() {
                Some(path) => format!(" Actions: {path} "),
                None => " Actions ".to_string(),
            };
            draw_picker(
                frame,
                &title,
                actions
                    .iter()
                    .map(|action| format!("{:<12} {}", action.label(), action.description()))
                    .collect(),
                *selected,
            );
        }
        ModalState::ChangelistPicker { request, selected } => {
            let mut items = app.changelist_choices();
            items.push("(new changelist...)".to_string());
            draw_picker(
                frame,
                &format!(" Move {} to ", request.target_label()),
                items,
                *selected,
            );
        }
        ModalState::Confirm { request } => {
            let area = centered_rect(60, 30, frame.area());
            frame.render_widget(Clear, area);

            let mut lines = vec![
                Line::from(format!("action: {}", request.action.label())),
                Line::from(format!("target: {}", request.target_label())),
                Line::from(""),
            ];
            if request.action == Action::Remove {
                lines.push(
                    Line::from("The file is deleted from disk and cannot be recovered.")
                        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                );
            }
            lines.push(Line::from("Enter / y: run  Esc / n: cancel"));

            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Confirm ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightRed)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        ModalState::Input {
            kind,
            request,
            value,
        } => {
            let area = centered_rect(70, 30, frame.area());
            frame.render_widget(Clear, area);

            let prompt = match kind {
                InputKind::PatchPath => "patch file (relative to the working copy)",
                InputKind::ChangelistName => "new changelist name",
            };

            let lines = vec![
                Line::from(format!("action: {}", request.action.label())),
                Line::from(format!("target: {}", request.target_label())),
                Line::from(""),
                Line::from(prompt),
                Line::from(format!("> {value}")).style(Style::default().fg(Color::Yellow)),
                Line::from("Enter: accept  Esc: cancel"),
            ];

            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Input ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightBlue)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
    }
}

const HELP_LINES: [&str; 16] = [
    "Tab          next pane (list, message, diff, log)",
    "j/k, arrows  move / scroll",
    "PgUp/PgDn    scroll diff or log",
    "Space        check entry, or whole changelist on its header",
    "A            check all / none",
    "Enter, d     diff of the selected entry",
    "m, a         action menu",
    "e            edit in $VISUAL / $EDITOR",
    "c            commit checked files",
    "p            write a patch of checked files",
    "u            show / hide unversioned files",
    "r            refresh",
    "i            edit the commit message (Esc to leave)",
    "< >          resize the file list",
    "q, Ctrl+C    quit",
    "?            close this help",
];

fn draw_picker(frame: &mut Frame, title: &str, items: Vec<String>, selected: usize) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let list = List::new(items.into_iter().map(ListItem::new).collect::<Vec<_>>())
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn diff_line_style(line: &str) -> Style {
    if line.starts_with("Index:") || line.starts_with("====") {
        Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::BOLD)
    } else if line.starts_with("+++") || line.starts_with("---") {
        Style::default().fg(Color::Cyan)
    } else if line.starts_with("@@") {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if line.starts_with('+') {
        Style::default().fg(Color::Green)
    } else if line.starts_with('-') {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    }
}

fn colorized_diff_lines(diff: &str) -> Vec<Line<'static>> {
    diff.lines()
        .map(|line| Line::from(Span::styled(line.to_string(), diff_line_style(line))))
        .collect()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
