//! Layout constants and colours for message bubbles
//!
//! All sizes are terminal cells. One text line is one row.

use ratatui::style::{Color, Modifier, Style};

/// Immutable configuration for [`super::BubbleLayoutEngine`]; copied per call.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleStyle {
    /// Avatar height in rows; its width is twice that in columns so it looks square
    pub avatar_size: u16,
    pub margin: u16,
    /// Horizontal padding between bubble edge and content
    pub bubble_padding_x: u16,
    /// Vertical padding between bubble edge and content
    pub bubble_padding_y: u16,
    /// Rounded border when non-zero, square border otherwise
    pub bubble_radius: u16,
    /// Gap between the sender-name header and the bubble
    pub name_spacing: u16,
    /// Gap between the blocks stacked inside a bubble
    pub block_spacing: u16,
    /// Share of the row width a bubble's content may use
    pub max_width_percent: u16,
    /// Content width used when the host has not measured its width yet
    pub fallback_content_width: u16,
    pub reply_padding: u16,
    pub image_thumb_width: u16,
    pub image_thumb_height: u16,
    pub file_card_min_width: u16,
    pub file_card_height: u16,
    pub chip_padding_x: u16,
    /// Rows above and below a chip label
    pub chip_padding_y: u16,
    pub chip_spacing: u16,
    pub pill_padding_x: u16,
    pub footer_height: u16,
    pub time_format: String,
    pub date_format: String,

    pub background_color: Color,
    pub my_bubble_color: Color,
    pub other_bubble_color: Color,
    pub bubble_border_color: Color,
    pub my_avatar_color: Color,
    pub other_avatar_color: Color,
    pub avatar_text_color: Color,
    pub name_color: Color,
    pub my_text_color: Color,
    pub other_text_color: Color,
    pub timestamp_color: Color,
    pub status_color: Color,
    pub failed_status_color: Color,
    pub system_text_color: Color,
    pub system_bubble_color: Color,
    pub reaction_chip_color: Color,
    pub reaction_text_color: Color,
    pub reply_border_color: Color,
    pub reply_text_color: Color,
    pub mention_highlight_color: Color,
    pub search_highlight_color: Color,
    pub file_card_color: Color,
    pub file_border_color: Color,

    pub message_font: Style,
    pub avatar_font: Style,
    pub name_font: Style,
    pub timestamp_font: Style,
    pub status_font: Style,
    pub system_font: Style,
    pub reaction_font: Style,
    pub reply_font: Style,
}

impl Default for BubbleStyle {
    fn default() -> Self {
        Self::light()
    }
}

impl BubbleStyle {
    pub fn light() -> Self {
        Self {
            avatar_size: 2,
            margin: 1,
            bubble_padding_x: 2,
            bubble_padding_y: 1,
            bubble_radius: 1,
            name_spacing: 0,
            block_spacing: 0,
            max_width_percent: 60,
            fallback_content_width: 40,
            reply_padding: 0,
            image_thumb_width: 16,
            image_thumb_height: 6,
            file_card_min_width: 24,
            file_card_height: 3,
            chip_padding_x: 1,
            chip_padding_y: 0,
            chip_spacing: 1,
            pill_padding_x: 2,
            footer_height: 1,
            time_format: "%H:%M".to_string(),
            date_format: "%Y-%m-%d".to_string(),

            background_color: Color::Rgb(245, 245, 245),
            my_bubble_color: Color::Rgb(255, 255, 255),
            other_bubble_color: Color::Rgb(255, 255, 255),
            bubble_border_color: Color::Rgb(220, 220, 220),
            my_avatar_color: Color::Rgb(0, 120, 215),
            other_avatar_color: Color::Rgb(200, 200, 200),
            avatar_text_color: Color::Rgb(255, 255, 255),
            name_color: Color::Rgb(120, 120, 120),
            my_text_color: Color::Rgb(25, 25, 25),
            other_text_color: Color::Rgb(25, 25, 25),
            timestamp_color: Color::Rgb(140, 140, 140),
            status_color: Color::Rgb(120, 120, 120),
            failed_status_color: Color::Rgb(220, 60, 60),
            system_text_color: Color::Rgb(110, 110, 110),
            system_bubble_color: Color::Rgb(230, 230, 230),
            reaction_chip_color: Color::Rgb(239, 239, 244),
            reaction_text_color: Color::Rgb(60, 60, 60),
            reply_border_color: Color::Rgb(200, 200, 200),
            reply_text_color: Color::Rgb(90, 90, 90),
            mention_highlight_color: Color::Rgb(255, 233, 198),
            search_highlight_color: Color::Rgb(255, 241, 118),
            file_card_color: Color::Rgb(250, 250, 252),
            file_border_color: Color::Rgb(220, 220, 220),

            message_font: Style::default(),
            avatar_font: Style::default().add_modifier(Modifier::BOLD),
            name_font: Style::default(),
            timestamp_font: Style::default(),
            status_font: Style::default(),
            system_font: Style::default(),
            reaction_font: Style::default(),
            reply_font: Style::default().add_modifier(Modifier::ITALIC),
        }
    }

    pub fn dark() -> Self {
        Self {
            background_color: Color::Rgb(25, 25, 25),
            my_bubble_color: Color::Rgb(74, 137, 52),
            other_bubble_color: Color::Rgb(50, 50, 50),
            bubble_border_color: Color::Rgb(70, 70, 70),
            my_avatar_color: Color::Rgb(0, 90, 170),
            other_avatar_color: Color::Rgb(100, 100, 100),
            name_color: Color::Rgb(160, 160, 160),
            my_text_color: Color::Rgb(230, 230, 230),
            other_text_color: Color::Rgb(230, 230, 230),
            timestamp_color: Color::Rgb(120, 120, 120),
            status_color: Color::Rgb(140, 140, 140),
            system_text_color: Color::Rgb(170, 170, 170),
            system_bubble_color: Color::Rgb(45, 45, 45),
            reaction_chip_color: Color::Rgb(60, 60, 66),
            reaction_text_color: Color::Rgb(210, 210, 210),
            reply_border_color: Color::Rgb(90, 90, 90),
            reply_text_color: Color::Rgb(170, 170, 170),
            mention_highlight_color: Color::Rgb(120, 90, 40),
            search_highlight_color: Color::Rgb(130, 120, 30),
            file_card_color: Color::Rgb(40, 40, 44),
            file_border_color: Color::Rgb(80, 80, 80),
            ..Self::light()
        }
    }

    /// Columns taken by an avatar
    pub fn avatar_width(&self) -> u16 {
        self.avatar_size.saturating_mul(2)
    }

    /// Minimum row height so the avatar never overflows
    pub fn min_row_height(&self) -> u16 {
        self.avatar_size.saturating_add(self.margin.saturating_mul(2))
    }

    pub fn bubble_color(&self, is_mine: bool) -> Color {
        if is_mine {
            self.my_bubble_color
        } else {
            self.other_bubble_color
        }
    }

    pub fn text_style(&self, is_mine: bool) -> Style {
        let fg = if is_mine {
            self.my_text_color
        } else {
            self.other_text_color
        };
        self.message_font.fg(fg).bg(self.bubble_color(is_mine))
    }

    pub fn avatar_color(&self, is_mine: bool) -> Color {
        if is_mine {
            self.my_avatar_color
        } else {
            self.other_avatar_color
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_keeps_light_geometry() {
        let light = BubbleStyle::light();
        let dark = BubbleStyle::dark();
        assert_eq!(light.avatar_size, dark.avatar_size);
        assert_eq!(light.max_width_percent, dark.max_width_percent);
        assert_ne!(light.my_bubble_color, dark.my_bubble_color);
    }

    #[test]
    fn test_min_row_height() {
        let style = BubbleStyle {
            avatar_size: 3,
            margin: 2,
            ..BubbleStyle::default()
        };
        assert_eq!(style.min_row_height(), 7);
        assert_eq!(style.avatar_width(), 6);
    }
}
