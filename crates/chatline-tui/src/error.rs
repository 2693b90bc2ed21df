//! Error types for the chatline-tui crate
//!
//! Widget operations never fail; these cover theme files, the clipboard and terminal I/O.

use std::io;
use thiserror::Error;

use crate::tui::theme::ThemeError;

/// Result type alias for chatline-tui operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chatline-tui
#[derive(Error, Debug)]
pub enum Error {
    /// Terminal I/O errors
    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// Theme loading errors
    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    /// System clipboard errors
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// UI rendering errors
    #[error("UI rendering error: {0}")]
    Rendering(String),
}

impl From<arboard::Error> for Error {
    fn from(err: arboard::Error) -> Self {
        Error::Clipboard(err.to_string())
    }
}
