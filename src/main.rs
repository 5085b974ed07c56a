mod actions;
mod app;
mod backend;
mod cli;
mod command;
mod config;
mod domain;
mod error;
mod handlers;
mod infra;
mod model;
mod status;
mod terminal;
mod ui;

use crate::actions::run_foreground_action;
use crate::app::{App, BackendEvent, BackendTask};
use crate::backend::worker_loop;
use crate::cli::Cli;
use crate::config::SessionConfig;
use crate::handlers::{handle_backend_event, handle_key_event};
use crate::infra::{ShellSvnClient, SvnClient};
use crate::terminal::{Tui, install_panic_hook, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_lenient(std::env::args_os());

    let mut config = match SessionConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load session, using defaults: {err:#}");
            SessionConfig::default()
        }
    };
    if cli.show_unversioned {
        config.show_unversioned = true;
    }
    if let Some(binary) = cli.svn {
        config.svn_binary = binary;
    }

    let client = ShellSvnClient::new(config.svn_binary.clone());
    let lines = match client.status() {
        Ok(lines) => lines,
        Err(err) => {
            eprintln!("svn-commit-tui: {err}");
            if err.exit_code().is_none() {
                eprintln!("svn-commit-tui: pass --svn <BIN> or set svn_binary in the session file");
            }
            std::process::exit(1);
        }
    };

    let mut app = App::new(config, cli.roots, client.working_dir().to_path_buf());
    app.apply_status_lines(lines);
    app.log(format!(
        "{} in {}",
        app.status_label(),
        app.working_dir().display()
    ));
    for root in app.watch_roots.clone() {
        app.log(format!("watching {}", root.display()));
    }

    install_panic_hook();
    setup_terminal()?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(io::stdout())).context("failed to create terminal")?;

    let run_result = run_app(&mut terminal, &mut app, Arc::new(client)).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = app.into_session().save() {
        eprintln!("failed to save session: {err:#}");
    }
    if let Err(err) = run_result {
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_app(terminal: &mut Tui, app: &mut App, client: Arc<dyn SvnClient>) -> Result<()> {
    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(client, task_rx, event_tx));

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(app, &task_tx, event)?;
        }

        if let Some(request) = app.pending_foreground.take() {
            run_foreground_action(terminal, app, &task_tx, request)?;
        }

        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(Duration::from_millis(100)).context("event poll failed")?
            && let Event::Key(key) = event::read().context("event read failed")?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(app, key, &task_tx)?;
        }
    }

    Ok(())
}
