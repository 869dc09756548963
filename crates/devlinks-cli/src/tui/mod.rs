//! devlinks dashboard
//!
//! Terminal dashboard for editing links and previewing the public page.
//!
//! ## Views
//!
//! - Edit: the link list, with validation problems under each entry
//! - Preview: name, email, avatar and links as a visitor sees them
//!
//! ## Keys
//!
//! - j/k or ↑/↓: Move selection
//! - a: Add link
//! - t: Cycle platform of the selected link
//! - e: Edit URL of the selected link
//! - d: Remove link (deleted remotely right away)
//! - s: Save (only when the changes are valid)
//! - r: Reload links / refresh preview
//! - p: Toggle edit and preview
//! - o or Enter: Open the selected link in the browser
//! - ?: Help
//! - q: Quit (asks again when there are unsaved changes)

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devlinks_core::{Config, SupabaseClient};

use app::{App, InputMode, Mode};

/// Run the dashboard for the signed-in user
pub async fn run(config: &Config, client: Arc<SupabaseClient>) -> Result<()> {
    // Fails with a sign-in hint before the terminal is touched
    let user_id = client.user_id().await?;

    // Initialize dashboard logging (file-based, only if DEVLINKS_LOG is set)
    init_tui_logging(config);

    enable_raw_mode()?;
    let mut app = App::new(client, user_id);
    let result = match stdout().execute(EnterAlternateScreen) {
        Ok(_) => match Terminal::new(CrosstermBackend::new(stdout())) {
            Ok(mut terminal) => start(&mut terminal, &mut app).await,
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    };

    // Restore terminal, whatever happened above
    finish(result, restore_terminal())
}

fn restore_terminal() -> Result<()> {
    let raw = disable_raw_mode();
    stdout().execute(LeaveAlternateScreen)?;
    raw?;
    Ok(())
}

/// The dashboard's own error wins over a failed restore
fn finish(session: Result<()>, restored: Result<()>) -> Result<()> {
    session.and(restored)
}

/// First frame, initial load, then the event loop
async fn start<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    draw_busy(terminal, app)?;
    app.load().await;
    app.is_loading = false;

    run_app(terminal, app).await
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.check_status_timeout();

        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Check for terminal events (non-blocking)
        if !event::poll(Duration::from_millis(0))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // If help is showing, any key dismisses it
        if app.show_help {
            app.show_help = false;
            continue;
        }

        match app.input_mode {
            InputMode::Normal => handle_normal_mode(terminal, app, key.code, key.modifiers).await?,
            InputMode::Url => handle_url_mode(app, key.code, key.modifiers),
        }

        if app.should_quit {
            info!("Dashboard closed");
            break;
        }
    }

    Ok(())
}

/// Show the busy indicator before a remote call
fn draw_busy<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, app))?;
    Ok(())
}

/// Handle key events in normal mode
async fn handle_normal_mode<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<()> {
    if code != KeyCode::Char('q') {
        app.confirm_quit = false;
    }

    match code {
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),

        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('p') => {
            if app.toggle_mode() {
                draw_busy(terminal, app)?;
                app.refresh_preview().await;
                app.is_loading = false;
            }
        }

        KeyCode::Char('o') | KeyCode::Enter => match app.current_url() {
            Some(url) => match open::that(&url) {
                Ok(()) => app.set_status(format!("Opened {}", url)),
                Err(e) => {
                    warn!("Failed to open {}: {}", url, e);
                    app.set_status(format!("Failed to open {}: {}", url, e));
                }
            },
            None => app.set_status("No URL to open"),
        },

        KeyCode::Char('r') => {
            draw_busy(terminal, app)?;
            match app.mode {
                Mode::Edit => app.reload().await,
                Mode::Preview => {
                    app.refresh_preview().await;
                    app.set_status("Preview refreshed");
                }
            }
            app.is_loading = false;
        }

        KeyCode::Char('a' | 't' | 'e' | 'd' | 's') if app.mode == Mode::Preview => {
            app.set_status("Press p to switch to the edit view");
        }

        KeyCode::Char('a') => app.add_link(),
        KeyCode::Char('t') => app.cycle_type(),
        KeyCode::Char('e') => app.start_url_edit(),
        KeyCode::Char('d') => {
            draw_busy(terminal, app)?;
            app.remove_current().await;
            app.is_loading = false;
        }
        KeyCode::Char('s') => {
            draw_busy(terminal, app)?;
            if app.save().await {
                app.refresh_preview().await;
            }
            app.is_loading = false;
        }

        _ => {}
    }

    Ok(())
}

/// Handle key events while typing a URL
fn handle_url_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Esc => app.exit_input_mode(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }
        KeyCode::Enter => app.confirm_url_edit(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        _ => {}
    }
}

/// Initialize logging for dashboard mode
///
/// Only initializes if DEVLINKS_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("DEVLINKS_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "devlinks_core={},devlinks_cli={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Dashboard logging initialized to {:?}", log_path);
}
