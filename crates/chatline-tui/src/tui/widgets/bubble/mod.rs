//! Bubble layout engine
//!
//! `measure` is pure geometry: given a record, the available row width and a style it
//! produces every rectangle of the row. `paint` redoes the same layout and draws it, so
//! both always agree. Nothing here touches the message store.

mod geometry;
mod paint;
mod style;

pub use geometry::{AttachmentKind, BubbleGeometry, ReactionChip};
pub use style::BubbleStyle;

use chatline_core::MessageRecord;
use chrono::Local;
use ratatui::buffer::Buffer;
use ratatui::layout::{Rect, Size};
use ratatui::style::Style;
use ratatui::text::Line;

use crate::tui::render::layout::{text_width, truncate_with_ellipsis};
use crate::tui::render::markup::apply_highlights;
use crate::tui::render::{
    CachedImages, FsImageDecoder, Highlight, ImageDecoder, LaidOutText, MarkdownRenderer, MarkupRenderer,
    TextLayout, WrapLayout,
};

/// Computes and paints message rows.
pub struct BubbleLayoutEngine {
    markup: Box<dyn MarkupRenderer>,
    text_layout: Box<dyn TextLayout>,
    images: Box<dyn ImageDecoder>,
    search_keyword: String,
}

impl std::fmt::Debug for BubbleLayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BubbleLayoutEngine")
            .field("search_keyword", &self.search_keyword)
            .finish_non_exhaustive()
    }
}

impl Default for BubbleLayoutEngine {
    fn default() -> Self {
        Self::new(
            Box::new(MarkdownRenderer::default()),
            Box::new(WrapLayout),
            Box::new(CachedImages::new(FsImageDecoder)),
        )
    }
}

impl BubbleLayoutEngine {
    pub fn new(
        markup: Box<dyn MarkupRenderer>,
        text_layout: Box<dyn TextLayout>,
        images: Box<dyn ImageDecoder>,
    ) -> Self {
        Self {
            markup,
            text_layout,
            images,
            search_keyword: String::new(),
        }
    }

    /// Keyword highlighted case-insensitively in every body. Empty disables it.
    pub fn set_search_keyword(&mut self, keyword: impl Into<String>) {
        self.search_keyword = keyword.into();
    }

    pub fn search_keyword(&self) -> &str {
        &self.search_keyword
    }

    /// Lay out one row. `available_width` of zero means the host has no width yet; the
    /// style's fallback content width is used instead.
    pub fn measure(
        &self,
        record: &MessageRecord,
        available_width: u16,
        style: &BubbleStyle,
    ) -> (BubbleGeometry, Size) {
        let geometry = if record.is_meta() {
            self.measure_meta(record, available_width, style)
        } else {
            self.measure_bubble(record, available_width, style)
        };
        let size = geometry.row_size;
        (geometry, size)
    }

    /// Draw one row into `area`, which is the row's rectangle in `buf`
    pub fn paint(&self, record: &MessageRecord, style: &BubbleStyle, area: Rect, buf: &mut Buffer) {
        let (geometry, _) = self.measure(record, area.width, style);
        paint::paint_row(record, &geometry, style, self.images.as_ref(), area, buf);
    }

    /// Draw a geometry measured earlier for the same record, style and width
    pub fn paint_geometry(
        &self,
        record: &MessageRecord,
        geometry: &BubbleGeometry,
        style: &BubbleStyle,
        area: Rect,
        buf: &mut Buffer,
    ) {
        paint::paint_row(record, geometry, style, self.images.as_ref(), area, buf);
    }

    fn measure_meta(
        &self,
        record: &MessageRecord,
        available_width: u16,
        style: &BubbleStyle,
    ) -> BubbleGeometry {
        let text = if record.body.trim().is_empty() {
            record
                .timestamp
                .with_timezone(&Local)
                .format(&style.date_format)
                .to_string()
        } else {
            record.body.clone()
        };

        let pad = style.pill_padding_x;
        let row_width = if available_width == 0 {
            style
                .fallback_content_width
                .max(1)
                .saturating_add(pad.saturating_mul(2))
        } else {
            available_width
        };
        let share = percent_of(row_width, style.max_width_percent);
        let max_inner = share.saturating_sub(pad.saturating_mul(2)).max(1);

        let text_style = style
            .system_font
            .fg(style.system_text_color)
            .bg(style.system_bubble_color);
        let wrapped: Vec<String> = textwrap::wrap(&text, usize::from(max_inner))
            .into_iter()
            .map(|l| l.into_owned())
            .collect();
        let wrapped = if wrapped.is_empty() {
            vec![String::new()]
        } else {
            wrapped
        };
        let inner_width = wrapped
            .iter()
            .map(|l| text_width(l))
            .max()
            .unwrap_or(0)
            .min(max_inner);
        let pill_height = u16::try_from(wrapped.len()).unwrap_or(u16::MAX);
        let pill_width = inner_width.saturating_add(pad.saturating_mul(2));

        let row_height = pill_height
            .saturating_add(style.margin.saturating_mul(2))
            .max(style.min_row_height());
        let pill = Rect::new(
            row_width.saturating_sub(pill_width) / 2,
            row_height.saturating_sub(pill_height) / 2,
            pill_width,
            pill_height,
        );

        BubbleGeometry {
            row_size: Size::new(row_width, row_height),
            is_mine: record.is_mine,
            is_meta: true,
            bubble: pill,
            body: Rect::new(pill.x + pad, pill.y, inner_width, pill_height),
            body_lines: wrapped
                .into_iter()
                .map(|l| Line::styled(l, text_style))
                .collect(),
            ..BubbleGeometry::default()
        }
    }

    fn measure_bubble(
        &self,
        record: &MessageRecord,
        available_width: u16,
        style: &BubbleStyle,
    ) -> BubbleGeometry {
        let margin = style.margin;
        let pad_x = style.bubble_padding_x;
        let pad_y = style.bubble_padding_y;
        let avatar_w = style.avatar_width();
        let chrome = avatar_w
            .saturating_add(margin.saturating_mul(3))
            .saturating_add(pad_x.saturating_mul(2));

        let (row_width, max_content) = if available_width == 0 {
            let content = style.fallback_content_width.max(1);
            (content.saturating_add(chrome), content)
        } else {
            let row_width = available_width.max(chrome.saturating_add(1));
            let lane = row_width.saturating_sub(chrome);
            let share = percent_of(row_width, style.max_width_percent);
            (row_width, share.min(lane).max(1))
        };
        let lane_outer = max_content.saturating_add(pad_x.saturating_mul(2));

        // Blocks, measured against the content width cap
        let body = self.layout_body(record, style, max_content);
        let body_height = body.height.max(1);

        let reply_lines = reply_labels(record, max_content.saturating_sub(2));
        let reply_size = (!reply_lines.is_empty()).then(|| {
            let widest = reply_lines.iter().map(|l| text_width(l)).max().unwrap_or(0);
            Size::new(
                widest.saturating_add(2).min(max_content),
                u16::try_from(reply_lines.len())
                    .unwrap_or(u16::MAX)
                    .saturating_add(style.reply_padding.saturating_mul(2)),
            )
        });

        let attachment_kind = if !record.has_attachment() {
            None
        } else if record.has_image_attachment() {
            Some(AttachmentKind::Image)
        } else {
            Some(AttachmentKind::File)
        };
        let attachment_size = attachment_kind.map(|kind| match kind {
            AttachmentKind::Image => Size::new(
                body.width.max(style.image_thumb_width).min(max_content),
                style.image_thumb_height,
            ),
            AttachmentKind::File => {
                let name_w = text_width(&record.attachment.file_name).saturating_add(4);
                Size::new(
                    body.width
                        .max(style.file_card_min_width)
                        .max(name_w)
                        .min(max_content),
                    style.file_card_height,
                )
            }
        });

        let mut content_width = body
            .width
            .max(reply_size.map_or(0, |s| s.width))
            .max(attachment_size.map_or(0, |s| s.width))
            .max(1);

        // Chips widen the bubble up to the cap; what still overflows is dropped whole
        let chip_sizes: Vec<(String, String, u16)> = record
            .reactions
            .iter()
            .map(|r| {
                let label = r.label();
                let width = text_width(&label).saturating_add(style.chip_padding_x.saturating_mul(2));
                (r.emoji.clone(), label, width)
            })
            .collect();
        if !chip_sizes.is_empty() {
            let total = chip_sizes.iter().map(|(_, _, w)| *w).fold(0u16, u16::saturating_add)
                .saturating_add(
                    style
                        .chip_spacing
                        .saturating_mul(u16::try_from(chip_sizes.len() - 1).unwrap_or(u16::MAX)),
                );
            content_width = content_width.max(total.min(max_content));
        }

        let mut stack = Stack::new(style.block_spacing);
        let reply_top = reply_size.map(|s| stack.push(s.height));
        let attachment_top = attachment_size.map(|s| stack.push(s.height));
        let body_top = stack.push(body_height);
        let chip_height = 1u16.saturating_add(style.chip_padding_y.saturating_mul(2));
        let chips_top = (!chip_sizes.is_empty()).then(|| stack.push(chip_height));
        let content_height = stack.height;

        let bubble_width = content_width.saturating_add(pad_x.saturating_mul(2));
        let bubble_height = content_height.saturating_add(pad_y.saturating_mul(2));

        let show_name = record.shows_sender_name();
        let content_top = if show_name {
            margin.saturating_add(1).saturating_add(style.name_spacing)
        } else {
            margin
        };

        let mine = record.is_mine;
        let avatar_x = if mine {
            row_width.saturating_sub(margin).saturating_sub(avatar_w)
        } else {
            margin
        };
        let bubble_x = if mine {
            avatar_x.saturating_sub(margin).saturating_sub(bubble_width)
        } else {
            avatar_x.saturating_add(avatar_w).saturating_add(margin)
        };
        let bubble = Rect::new(bubble_x, content_top, bubble_width, bubble_height);
        // Same side of the lane as the bubble, right-aligned for own messages
        let align = |width: u16| -> u16 {
            if mine {
                bubble.right().saturating_sub(width)
            } else {
                bubble.x
            }
        };

        let inner_x = bubble.x.saturating_add(pad_x);
        let inner_y = bubble.y.saturating_add(pad_y);

        let (name, name_text) = if show_name {
            let text = truncate_with_ellipsis(&record.sender_display_name, lane_outer);
            let width = text_width(&text);
            (Some(Rect::new(align(width), margin, width, 1)), text)
        } else {
            (None, String::new())
        };

        let mut reactions = Vec::new();
        let mut chip_x = 0u16;
        for (emoji, label, width) in &chip_sizes {
            let x = if reactions.is_empty() {
                0
            } else {
                chip_x.saturating_add(style.chip_spacing)
            };
            if x.saturating_add(*width) > content_width {
                break;
            }
            reactions.push(ReactionChip {
                rect: Rect::new(
                    inner_x.saturating_add(x),
                    inner_y.saturating_add(chips_top.unwrap_or(0)),
                    *width,
                    chip_height,
                ),
                emoji: emoji.clone(),
                label: label.clone(),
                radius: chip_height / 2,
            });
            chip_x = x.saturating_add(*width);
        }
        let hidden_reactions = chip_sizes.len() - reactions.len();

        // Footer: time plus, for own messages, delivery status
        let footer_y = bubble.bottom();
        let footer_height = style.footer_height;
        let time_text = record
            .timestamp
            .with_timezone(&Local)
            .format(&style.time_format)
            .to_string();
        let time_text = truncate_with_ellipsis(&time_text, lane_outer);
        let time_width = text_width(&time_text);
        let status_text = if mine {
            let room = lane_outer.saturating_sub(time_width).saturating_sub(1);
            truncate_with_ellipsis(&record.status.to_string(), room)
        } else {
            String::new()
        };
        let status_width = text_width(&status_text);
        let (timestamp, status) = if footer_height == 0 {
            (None, None)
        } else if mine {
            let status_x = bubble.right().saturating_sub(status_width);
            let gap = u16::from(status_width > 0);
            let time_x = status_x.saturating_sub(gap).saturating_sub(time_width);
            (
                (time_width > 0).then(|| Rect::new(time_x, footer_y, time_width, 1)),
                (status_width > 0).then(|| Rect::new(status_x, footer_y, status_width, 1)),
            )
        } else {
            (
                (time_width > 0).then(|| Rect::new(bubble.x, footer_y, time_width, 1)),
                None,
            )
        };

        let row_height = footer_y
            .saturating_add(footer_height)
            .saturating_add(margin)
            .max(style.min_row_height());

        BubbleGeometry {
            row_size: Size::new(row_width, row_height),
            is_mine: mine,
            is_meta: false,
            avatar: Some(Rect::new(avatar_x, margin, avatar_w, style.avatar_size)),
            name,
            name_text,
            bubble,
            reply: reply_size
                .zip(reply_top)
                .map(|(s, top)| Rect::new(inner_x, inner_y + top, s.width, s.height)),
            reply_lines,
            attachment: attachment_size
                .zip(attachment_top)
                .map(|(s, top)| Rect::new(inner_x, inner_y + top, s.width, s.height)),
            attachment_kind,
            body: Rect::new(inner_x, inner_y + body_top, content_width, body_height),
            body_lines: body.lines,
            reactions,
            hidden_reactions,
            timestamp,
            timestamp_text: time_text,
            status,
            status_text,
        }
    }

    fn layout_body(&self, record: &MessageRecord, style: &BubbleStyle, max_width: u16) -> LaidOutText {
        let mut marked = self.markup.render(&record.body, style.text_style(record.is_mine));

        let mention = Style::default().bg(style.mention_highlight_color);
        let search = Style::default().bg(style.search_highlight_color);
        let highlights: Vec<Highlight> = record
            .mentions
            .iter()
            .filter_map(|m| Highlight::literal(m, mention))
            .chain(Highlight::literal_ignore_case(&self.search_keyword, search))
            .collect();
        apply_highlights(&mut marked, &highlights);

        self.text_layout.layout(&marked, max_width)
    }
}

fn percent_of(width: u16, percent: u16) -> u16 {
    let scaled = u32::from(width) * u32::from(percent.min(100)) / 100;
    u16::try_from(scaled).unwrap_or(u16::MAX)
}

/// Forward label and reply quote lines, each cut to `max_width`
fn reply_labels(record: &MessageRecord, max_width: u16) -> Vec<String> {
    let reply = &record.reply;
    let mut lines = Vec::new();
    if reply.is_forwarded {
        let label = if reply.forwarded_from_name.is_empty() {
            "Forwarded".to_string()
        } else {
            format!("Forwarded from {}", reply.forwarded_from_name)
        };
        lines.push(truncate_with_ellipsis(&label, max_width));
    }
    if reply.has_reply() {
        let quote = match (
            reply.reply_sender_name.is_empty(),
            reply.reply_preview_text.is_empty(),
        ) {
            (false, false) => format!("{}: {}", reply.reply_sender_name, reply.reply_preview_text),
            (false, true) => reply.reply_sender_name.clone(),
            (true, false) => reply.reply_preview_text.clone(),
            (true, true) => "Reply".to_string(),
        };
        lines.push(truncate_with_ellipsis(&quote, max_width));
    }
    lines
}

/// Vertical stacking of blocks inside a bubble
struct Stack {
    height: u16,
    spacing: u16,
    empty: bool,
}

impl Stack {
    fn new(spacing: u16) -> Self {
        Self {
            height: 0,
            spacing,
            empty: true,
        }
    }

    /// Returns the block's top offset
    fn push(&mut self, height: u16) -> u16 {
        if !self.empty {
            self.height = self.height.saturating_add(self.spacing);
        }
        self.empty = false;
        let top = self.height;
        self.height = self.height.saturating_add(height);
        top
    }
}
