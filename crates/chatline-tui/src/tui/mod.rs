//! Terminal widgets for chatline

pub mod clipboard;
pub mod panel;
pub mod render;
pub mod theme;
pub mod widgets;

pub use clipboard::{Clipboard, MemoryClipboard, SystemClipboard};
pub use panel::ChatPanel;
pub use theme::{Theme, ThemeError, ThemeEvent, ThemeLoader, ThemeProvider};
