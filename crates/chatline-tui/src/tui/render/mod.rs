//! Collaborators used by the bubble layout engine: markup, text layout and images

pub mod images;
pub mod layout;
pub mod markdown;
pub mod markup;

pub use images::{CachedImages, FsImageDecoder, ImageDecoder, NoImages};
pub use layout::{LaidOutText, TextLayout, WrapLayout};
pub use markdown::{MarkdownStyles, MarkedLine, MarkedText};
pub use markup::{Highlight, MarkdownRenderer, MarkupRenderer, PlainRenderer};
