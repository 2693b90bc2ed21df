use std::fs;
use std::io;
use std::path::Path;

use chatline_tui::tui::{Theme, ThemeLoader, ThemeProvider};
use clap::Parser;
use eyre::{Result, WrapErr};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod app;
mod cli;
mod demo;
mod terminal;

use app::App;
use cli::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        init_tracing(path)?;
    }

    let loader = ThemeLoader::new();
    let theme = resolve_theme(&loader, &cli)?;
    info!(target: "chatline", "using theme {}", theme.name);
    let history = cli.history.as_deref().map(app::load_history).transpose()?;

    let app = App::with_demo_data(ThemeProvider::new(theme, loader), &cli.user, history);

    terminal::setup_panic_hook();
    let mut guard = terminal::SetupGuard::new();
    let mut stdout = io::stdout();
    terminal::setup(&mut stdout)?;
    let mut tui = Terminal::new(CrosstermBackend::new(stdout))?;
    tui.clear()?;

    let result = app.run(&mut tui);

    terminal::cleanup();
    guard.disarm();
    tui.show_cursor()?;
    result
}

/// File logger filtered by RUST_LOG; nothing is written to the terminal the UI owns
fn init_tracing(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let Some(file_name) = path.file_name() else {
        eyre::bail!("log file path {} has no file name", path.display());
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()?;

    debug!(target: "chatline", path = %path.display(), "tracing initialized");
    Ok(())
}

fn resolve_theme(loader: &ThemeLoader, cli: &Cli) -> Result<Theme> {
    if let Some(path) = &cli.theme_file {
        return loader
            .load_theme_from_path(path)
            .wrap_err_with(|| format!("failed to load theme file {}", path.display()));
    }
    match &cli.theme {
        Some(name) => loader
            .load_theme(name)
            .wrap_err_with(|| format!("failed to load theme {name}")),
        None => Ok(Theme::light()),
    }
}
