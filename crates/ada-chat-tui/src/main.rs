use std::path::PathBuf;

use anyhow::Result;
use ada_chat_core::Config;

mod app;
mod handler;
mod markdown;
mod metrics;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_FILTER: &str = "info";

fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ada-chat")
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(config: &Config) {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    #[cfg(unix)]
    let null_device = "/dev/null";
    #[cfg(windows)]
    let null_device = "NUL";

    let log_file = match std::fs::File::create(log_dir.join("ada-chat.log"))
        .or_else(|_| std::fs::File::create(null_device))
    {
        Ok(file) => file,
        Err(_) => return,
    };

    // RUST_LOG wins over the config file
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
        tracing_subscriber::EnvFilter::try_new(directives)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    init_logging(&config);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "could not load config, using defaults");
    }

    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    app.probe_backend();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
