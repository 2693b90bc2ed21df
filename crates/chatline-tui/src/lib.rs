pub mod error;
pub mod tui;

pub use error::{Error, Result};
