//! Theme system for chatline-tui
//!
//! A theme bundles the bubble style and the conversation-list style. Two presets are built
//! in; further themes are TOML files that start from a preset and override individual
//! colours and layout constants.

use ratatui::style::Color;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use thiserror::Error;

use crate::tui::widgets::bubble::BubbleStyle;
use crate::tui::widgets::composer::ComposerStyle;
use crate::tui::widgets::conversation_list::ConversationListStyle;

mod loader;
mod provider;

pub use loader::ThemeLoader;
pub use provider::{ThemeEvent, ThemeProvider};

/// Errors that can occur during theme operations
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid color value: {0}")]
    InvalidColor(String),

    #[error("Theme not found: {0}")]
    NotFound(String),
}

/// Styles for every themed widget
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub bubble: BubbleStyle,
    pub conversation_list: ConversationListStyle,
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

impl Theme {
    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            bubble: BubbleStyle::light(),
            conversation_list: ConversationListStyle::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            bubble: BubbleStyle::dark(),
            conversation_list: ConversationListStyle::dark(),
        }
    }

    /// Built-in theme by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "light" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    pub fn composer_style(&self) -> ComposerStyle {
        ComposerStyle::from_bubble(&self.bubble)
    }
}

/// RGB color that can be deserialized from hex strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match parse_hex(&s) {
            Some((r, g, b)) => Ok(RgbColor(r, g, b)),
            None => Err(serde::de::Error::custom(format!("Invalid hex color: {s}"))),
        }
    }
}

impl From<RgbColor> for Color {
    fn from(rgb: RgbColor) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

/// Bubble overrides. Colour fields name a palette entry, a `#rrggbb` value or a basic
/// colour name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBubbleStyle {
    pub avatar_size: Option<u16>,
    pub margin: Option<u16>,
    pub bubble_padding_x: Option<u16>,
    pub bubble_padding_y: Option<u16>,
    pub bubble_radius: Option<u16>,
    pub name_spacing: Option<u16>,
    pub block_spacing: Option<u16>,
    pub max_width_percent: Option<u16>,
    pub fallback_content_width: Option<u16>,
    pub reply_padding: Option<u16>,
    pub image_thumb_width: Option<u16>,
    pub image_thumb_height: Option<u16>,
    pub file_card_min_width: Option<u16>,
    pub file_card_height: Option<u16>,
    pub chip_padding_x: Option<u16>,
    pub chip_padding_y: Option<u16>,
    pub chip_spacing: Option<u16>,
    pub pill_padding_x: Option<u16>,
    pub footer_height: Option<u16>,
    pub time_format: Option<String>,
    pub date_format: Option<String>,

    pub background: Option<String>,
    pub my_bubble: Option<String>,
    pub other_bubble: Option<String>,
    pub bubble_border: Option<String>,
    pub my_avatar: Option<String>,
    pub other_avatar: Option<String>,
    pub avatar_text: Option<String>,
    pub name: Option<String>,
    pub my_text: Option<String>,
    pub other_text: Option<String>,
    pub timestamp: Option<String>,
    pub status: Option<String>,
    pub failed_status: Option<String>,
    pub system_text: Option<String>,
    pub system_bubble: Option<String>,
    pub reaction_chip: Option<String>,
    pub reaction_text: Option<String>,
    pub reply_border: Option<String>,
    pub reply_text: Option<String>,
    pub mention_highlight: Option<String>,
    pub search_highlight: Option<String>,
    pub file_card: Option<String>,
    pub file_border: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConversationListStyle {
    pub item_height: Option<u16>,
    pub avatar_width: Option<u16>,
    pub background: Option<String>,
    pub hover: Option<String>,
    pub selected: Option<String>,
    pub name: Option<String>,
    pub message: Option<String>,
    pub time: Option<String>,
    pub separator: Option<String>,
    pub badge: Option<String>,
    pub badge_text: Option<String>,
    pub avatar_text: Option<String>,
}

/// Raw theme as loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTheme {
    pub name: String,
    /// Preset the overrides apply to; `light` when absent
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub palette: HashMap<String, RgbColor>,
    #[serde(default)]
    pub bubble: RawBubbleStyle,
    #[serde(default)]
    pub conversation_list: RawConversationListStyle,
}

macro_rules! override_values {
    ($target:expr, $raw:expr; $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = $raw.$field.clone() {
                $target.$field = value;
            }
        )*
    };
}

macro_rules! override_colors {
    ($self:ident, $target:expr, $raw:expr; $($field:ident => $color:ident),* $(,)?) => {
        $(
            if let Some(value) = &$raw.$field {
                $target.$color = $self.resolve_color(value)?;
            }
        )*
    };
}

impl RawTheme {
    /// Apply the overrides to the base preset
    pub fn into_theme(self) -> Result<Theme, ThemeError> {
        if self.name.trim().is_empty() {
            return Err(ThemeError::Validation("theme name is empty".to_string()));
        }
        let base_name = self.base.as_deref().unwrap_or("light");
        let base = Theme::preset(base_name).ok_or_else(|| {
            ThemeError::Validation(format!("unknown base theme '{base_name}'"))
        })?;

        let mut bubble = base.bubble;
        let raw = &self.bubble;
        override_values!(bubble, raw;
            avatar_size, margin, bubble_padding_x, bubble_padding_y, bubble_radius,
            name_spacing, block_spacing, max_width_percent, fallback_content_width,
            reply_padding, image_thumb_width, image_thumb_height, file_card_min_width,
            file_card_height, chip_padding_x, chip_padding_y, chip_spacing, pill_padding_x, footer_height,
            time_format, date_format,
        );
        override_colors!(self, bubble, raw;
            background => background_color,
            my_bubble => my_bubble_color,
            other_bubble => other_bubble_color,
            bubble_border => bubble_border_color,
            my_avatar => my_avatar_color,
            other_avatar => other_avatar_color,
            avatar_text => avatar_text_color,
            name => name_color,
            my_text => my_text_color,
            other_text => other_text_color,
            timestamp => timestamp_color,
            status => status_color,
            failed_status => failed_status_color,
            system_text => system_text_color,
            system_bubble => system_bubble_color,
            reaction_chip => reaction_chip_color,
            reaction_text => reaction_text_color,
            reply_border => reply_border_color,
            reply_text => reply_text_color,
            mention_highlight => mention_highlight_color,
            search_highlight => search_highlight_color,
            file_card => file_card_color,
            file_border => file_border_color,
        );
        if bubble.max_width_percent == 0 || bubble.max_width_percent > 100 {
            return Err(ThemeError::Validation(format!(
                "max_width_percent must be within 1..=100, got {}",
                bubble.max_width_percent
            )));
        }

        let mut list = base.conversation_list;
        let raw = &self.conversation_list;
        override_values!(list, raw; item_height, avatar_width);
        override_colors!(self, list, raw;
            background => background_color,
            hover => hover_color,
            selected => selected_color,
            name => name_color,
            message => message_color,
            time => time_color,
            separator => separator_color,
            badge => badge_color,
            badge_text => badge_text_color,
            avatar_text => avatar_text_color,
        );

        Ok(Theme {
            name: self.name,
            bubble,
            conversation_list: list,
        })
    }

    /// Palette entry first, then a literal colour
    fn resolve_color(&self, value: &str) -> Result<Color, ThemeError> {
        if let Some(rgb) = self.palette.get(value) {
            return Ok((*rgb).into());
        }
        parse_direct_color(value)
    }
}

fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Parse a direct color string (hex or named)
fn parse_direct_color(color_str: &str) -> Result<Color, ThemeError> {
    if let Some((r, g, b)) = parse_hex(color_str) {
        return Ok(Color::Rgb(r, g, b));
    }
    match color_str.to_lowercase().as_str() {
        "black" => Ok(Color::Black),
        "red" => Ok(Color::Red),
        "green" => Ok(Color::Green),
        "yellow" => Ok(Color::Yellow),
        "blue" => Ok(Color::Blue),
        "magenta" => Ok(Color::Magenta),
        "cyan" => Ok(Color::Cyan),
        "white" => Ok(Color::White),
        "gray" | "grey" => Ok(Color::Gray),
        "darkgray" | "darkgrey" | "dark_gray" | "dark_grey" => Ok(Color::DarkGray),
        "reset" => Ok(Color::Reset),
        _ => Err(ThemeError::InvalidColor(color_str.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_to_base() {
        let raw: RawTheme = toml::from_str(
            r##"
name = "custom"
base = "dark"

[palette]
accent = "#ff8800"

[bubble]
my_bubble = "accent"
other_bubble = "#101010"
name = "cyan"
max_width_percent = 75
time_format = "%H:%M:%S"

[conversation_list]
badge = "accent"
item_height = 2
"##,
        )
        .unwrap();
        let theme = raw.into_theme().unwrap();

        assert_eq!(theme.name, "custom");
        assert_eq!(theme.bubble.my_bubble_color, Color::Rgb(255, 136, 0));
        assert_eq!(theme.bubble.other_bubble_color, Color::Rgb(16, 16, 16));
        assert_eq!(theme.bubble.name_color, Color::Cyan);
        assert_eq!(theme.bubble.max_width_percent, 75);
        assert_eq!(theme.bubble.time_format, "%H:%M:%S");
        // Untouched fields come from the dark preset
        assert_eq!(
            theme.bubble.background_color,
            BubbleStyle::dark().background_color
        );
        assert_eq!(theme.conversation_list.badge_color, Color::Rgb(255, 136, 0));
        assert_eq!(theme.conversation_list.item_height, 2);
    }

    #[test]
    fn test_unknown_color_is_rejected() {
        let raw: RawTheme = toml::from_str(
            r##"
name = "broken"
[bubble]
my_bubble = "not-a-color"
"##,
        )
        .unwrap();
        assert!(matches!(
            raw.into_theme(),
            Err(ThemeError::InvalidColor(c)) if c == "not-a-color"
        ));
    }

    #[test]
    fn test_unknown_field_is_a_parse_error() {
        let result: Result<RawTheme, _> = toml::from_str(
            r##"
name = "typo"
[bubble]
my_buble = "#000000"
"##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_width_percent() {
        let raw: RawTheme = toml::from_str(
            r##"
name = "wide"
[bubble]
max_width_percent = 150
"##,
        )
        .unwrap();
        assert!(matches!(raw.into_theme(), Err(ThemeError::Validation(_))));
    }

    #[test]
    fn test_presets() {
        assert_eq!(Theme::preset("Dark").unwrap().name, "dark");
        assert!(Theme::preset("sepia").is_none());
        assert_ne!(
            Theme::light().conversation_list.background_color,
            Theme::dark().conversation_list.background_color
        );
    }
}
