//! StockPanel - a terminal admin panel for inventory backends.
//!
//! This application provides a fast, keyboard-driven interface for managing
//! products, categories, warehouses, users and stock movements, with the
//! session guard ending the session when the access token expires.

mod app;
mod form;
mod session;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockpanel_core::api::ApiClient;
use stockpanel_core::auth::{Route, SessionGuard, SharedStorage, SystemClock};
use stockpanel_core::models::ReportKind;
use stockpanel_core::Config;

use app::{App, AppState};
use session::ChannelNavigator;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// How often the session file is checked for logins and logouts made by
/// other running clients.
const STORAGE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// File name prefix for the rolling log.
const LOG_FILE_PREFIX: &str = "stockpanel.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a daily file in the cache
/// directory. Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = match Config::log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            return None;
        }
    };
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!(error = format!("{:#}", e), "Failed to load config, using defaults");
        Config::default()
    })
}

fn open_storage() -> SharedStorage {
    match Config::storage_path().and_then(SharedStorage::open) {
        Ok(storage) => storage,
        Err(e) => {
            warn!(error = format!("{:#}", e), "Session storage unavailable, keeping it in memory");
            SharedStorage::in_memory()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--export-report" {
        return export_report(&args[2..]).await;
    }

    info!("StockPanel starting");

    let config = load_config();
    let storage = open_storage();
    let _storage_watch = storage.watch(STORAGE_POLL_INTERVAL);
    let mut app = App::new(config, &storage)?;
    app.open(Route::Root);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("StockPanel shutting down");
    Ok(())
}

/// Download a report PDF with the stored session and exit.
async fn export_report(args: &[String]) -> Result<()> {
    let Some(kind) = args.first() else {
        bail!(
            "Usage: stockpanel --export-report <{}> [dir]",
            ReportKind::ALL.map(|k| k.key()).join("|")
        );
    };
    let kind = ReportKind::from_key(kind)
        .with_context(|| format!("Unknown report '{}'", kind))?;
    let dir = args.get(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let config = load_config();
    let storage = open_storage();
    let (tx, _rx) = mpsc::unbounded_channel();
    let session = SessionGuard::new(
        storage.open_tab(),
        Arc::new(SystemClock),
        Arc::new(ChannelNavigator::new(tx)),
    );
    if !session.is_authenticated() || session.is_token_expired() {
        bail!("No active session. Run stockpanel and log in first.");
    }

    let api = ApiClient::from_config(&config, session)?;
    eprintln!("Downloading {} report...", kind.title());
    let path = api.save_report_pdf(kind, &dir).await?;
    println!("{}", path.display());
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if key.kind == KeyEventKind::Press && handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Session timer and other tabs may have logged us out
        app.process_session_events();

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
