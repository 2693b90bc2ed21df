use std::str::FromStr;

use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

/// Entries the command popup shows at most
pub const MAX_MENU_ENTRIES: usize = 6;

/// Errors from parsing composer input as a slash command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("not a slash command")]
    NotACommand,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// How committed text is meant to be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum InputMode {
    #[default]
    Normal,
    Translate,
}

/// Built-in slash commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ComposerCommand {
    Trans,
    Normal,
}

impl ComposerCommand {
    pub fn command_name(&self) -> String {
        format!("/{self}")
    }

    pub fn description(&self) -> &'static str {
        match self {
            ComposerCommand::Trans => "Translate mode",
            ComposerCommand::Normal => "Normal mode",
        }
    }

    /// Popup row text, e.g. `/trans  Translate mode`
    pub fn label(&self) -> String {
        format!("{:<8}{}", self.command_name(), self.description())
    }

    pub fn mode(&self) -> InputMode {
        match self {
            ComposerCommand::Trans => InputMode::Translate,
            ComposerCommand::Normal => InputMode::Normal,
        }
    }
}

impl FromStr for ComposerCommand {
    type Err = CommandParseError;

    /// Only the first whitespace-delimited token is compared, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.split_whitespace().next().unwrap_or_default();
        let Some(name) = token.strip_prefix('/') else {
            return Err(CommandParseError::NotACommand);
        };
        ComposerCommand::iter()
            .find(|cmd| cmd.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| CommandParseError::UnknownCommand(token.to_string()))
    }
}

/// Commands whose name starts with the trimmed text after the leading `/`, case-insensitive.
/// Empty unless `text` starts with `/`.
pub fn filter_commands(text: &str) -> Vec<ComposerCommand> {
    let Some(rest) = text.strip_prefix('/') else {
        return Vec::new();
    };
    let rest = rest.trim().to_lowercase();
    ComposerCommand::iter()
        .filter(|cmd| cmd.to_string().starts_with(&rest))
        .take(MAX_MENU_ENTRIES)
        .collect()
}
