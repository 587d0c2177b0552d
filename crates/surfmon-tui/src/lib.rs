//! Live terminal dashboard for surfmon

mod app;
mod ui;

pub use app::{Dashboard, DashboardView, RECENT_ROWS};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Redraw interval
const TICK: Duration = Duration::from_millis(250);

/// Run the dashboard until the user quits or shutdown is signalled.
///
/// `shutdown_rx` must be subscribed before any other task can signal, so no
/// signal is missed. Quitting from the keyboard broadcasts on `shutdown` so
/// the watcher stops with the dashboard.
pub async fn run(
    dashboard: Dashboard,
    shutdown: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &dashboard, &shutdown, shutdown_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    dashboard: &Dashboard,
    shutdown: &broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    loop {
        let view = dashboard.snapshot();
        terminal.draw(|f| ui::draw(f, &view))?;

        if !matches!(
            shutdown_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ) {
            info!("Dashboard stopping on shutdown signal");
            return Ok(());
        }

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if is_quit_key(&key) {
                    info!("Dashboard closed by user");
                    let _ = shutdown.send(());
                    return Ok(());
                }
            }
        }

        tokio::task::yield_now().await;
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
