use clap::Parser;
use std::path::PathBuf;

/// Terminal chat demo: a conversation sidebar next to a chat panel with a simulated assistant
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Theme name (light, dark, a bundled theme or a file in the themes directory)
    #[arg(long, env = "CHATLINE_THEME")]
    pub theme: Option<String>,

    /// Load the theme from a TOML file instead of by name
    #[arg(long, conflicts_with = "theme")]
    pub theme_file: Option<PathBuf>,

    /// Write logs here; the terminal belongs to the UI. Filter with RUST_LOG.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Sender id of the local user
    #[arg(long, default_value = "me")]
    pub user: String,

    /// JSON array of history messages for the first conversation
    #[arg(long)]
    pub history: Option<PathBuf>,
}
