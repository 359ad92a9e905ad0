//! SearchAgent TUI: interactive session with login, table enrichment, and
//! related news, built with `ratatui` + `crossterm`.

mod app;
mod screens;
mod tasks;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use searchagent_shared::{config_dir, load_config};

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    init_tracing()?;
    let config = load_config()?;
    app::run(config)
}

/// Log to `~/.searchagent/tui.log`; the terminal belongs to the UI.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("searchagent=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
