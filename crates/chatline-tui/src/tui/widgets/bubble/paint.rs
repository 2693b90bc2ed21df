use chatline_core::{MessageRecord, MessageStatus};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Widget};

use super::geometry::{AttachmentKind, BubbleGeometry, place};
use super::style::BubbleStyle;
use crate::tui::render::images::{ImageDecoder, paint_half_blocks};
use crate::tui::render::layout::{format_size, text_width, truncate_with_ellipsis};

pub(super) fn paint_row(
    record: &MessageRecord,
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
    images: &dyn ImageDecoder,
    area: Rect,
    buf: &mut Buffer,
) {
    let row = area.intersection(buf.area);
    if row.is_empty() {
        return;
    }
    buf.set_style(row, Style::default().bg(style.background_color));

    if geometry.is_meta {
        paint_pill(geometry, style, area, buf);
        return;
    }

    if let Some(avatar) = geometry.avatar {
        paint_avatar(record, style, images, place(avatar, area), buf);
    }

    if let Some(name) = geometry.name {
        let at = place(name, area);
        put_str(
            buf,
            at.x,
            at.y,
            &geometry.name_text,
            at.width,
            style.name_font.fg(style.name_color).bg(style.background_color),
        );
    }

    let bubble = place(geometry.bubble, area);
    let bubble_style = Style::default().bg(style.bubble_color(record.is_mine));
    if style.bubble_padding_x > 0 && style.bubble_padding_y > 0 {
        let border_type = if style.bubble_radius > 0 {
            BorderType::Rounded
        } else {
            BorderType::Plain
        };
        Block::bordered()
            .border_type(border_type)
            .border_style(bubble_style.fg(style.bubble_border_color))
            .style(bubble_style)
            .render(bubble.intersection(buf.area), buf);
    } else {
        buf.set_style(bubble.intersection(buf.area), bubble_style);
    }

    if let Some(reply) = geometry.reply {
        paint_reply(geometry, style, record.is_mine, place(reply, area), buf);
    }

    if let (Some(rect), Some(kind)) = (geometry.attachment, geometry.attachment_kind) {
        let rect = place(rect, area);
        match kind {
            AttachmentKind::Image => paint_image_card(record, style, images, rect, buf),
            AttachmentKind::File => paint_file_card(record, style, rect, buf),
        }
    }

    let body = place(geometry.body, area);
    for (i, line) in geometry.body_lines.iter().enumerate() {
        let Ok(dy) = u16::try_from(i) else { break };
        if dy >= body.height {
            break;
        }
        put_line(buf, body.x, body.y + dy, line, body.width);
    }

    let chip_style = style
        .reaction_font
        .fg(style.reaction_text_color)
        .bg(style.reaction_chip_color);
    for chip in &geometry.reactions {
        let rect = place(chip.rect, area);
        buf.set_style(rect.intersection(buf.area), chip_style);
        put_str(
            buf,
            rect.x + style.chip_padding_x,
            rect.y + chip.radius,
            &chip.label,
            rect.width.saturating_sub(style.chip_padding_x),
            chip_style,
        );
    }

    let footer_bg = Style::default().bg(style.background_color);
    if let Some(rect) = geometry.timestamp {
        let at = place(rect, area);
        put_str(
            buf,
            at.x,
            at.y,
            &geometry.timestamp_text,
            at.width,
            footer_bg.patch(style.timestamp_font.fg(style.timestamp_color)),
        );
    }
    if let Some(rect) = geometry.status {
        let at = place(rect, area);
        let color = if record.status == MessageStatus::Failed {
            style.failed_status_color
        } else {
            style.status_color
        };
        put_str(
            buf,
            at.x,
            at.y,
            &geometry.status_text,
            at.width,
            footer_bg.patch(style.status_font.fg(color)),
        );
    }
}

fn paint_pill(geometry: &BubbleGeometry, style: &BubbleStyle, area: Rect, buf: &mut Buffer) {
    let pill = place(geometry.bubble, area);
    buf.set_style(
        pill.intersection(buf.area),
        Style::default().bg(style.system_bubble_color),
    );
    let body = place(geometry.body, area);
    for (dy, line) in (0..body.height).zip(&geometry.body_lines) {
        // Each line centered inside the pill
        let offset = body.width.saturating_sub(line.width() as u16) / 2;
        put_line(buf, body.x + offset, body.y + dy, line, body.width - offset);
    }
}

fn paint_avatar(
    record: &MessageRecord,
    style: &BubbleStyle,
    images: &dyn ImageDecoder,
    rect: Rect,
    buf: &mut Buffer,
) {
    if let Some(thumb) = images.thumbnail(&record.avatar_ref, rect.as_size()) {
        paint_half_blocks(&thumb, rect, buf);
        return;
    }
    let fill = Style::default().bg(style.avatar_color(record.is_mine));
    buf.set_style(rect.intersection(buf.area), fill);
    let initial = record.avatar_initial();
    let width = text_width(&initial);
    let x = rect.x + rect.width.saturating_sub(width) / 2;
    let y = rect.y + rect.height.saturating_sub(1) / 2;
    put_str(
        buf,
        x,
        y,
        &initial,
        rect.width,
        fill.patch(style.avatar_font.fg(style.avatar_text_color)),
    );
}

fn paint_reply(
    geometry: &BubbleGeometry,
    style: &BubbleStyle,
    is_mine: bool,
    rect: Rect,
    buf: &mut Buffer,
) {
    let bg = style.bubble_color(is_mine);
    let bar = Style::default().fg(style.reply_border_color).bg(bg);
    let text = style.reply_font.fg(style.reply_text_color).bg(bg);
    for dy in 0..rect.height {
        put_str(buf, rect.x, rect.y + dy, "▎", 1, bar);
    }
    let top = rect.y + style.reply_padding;
    for (dy, label) in (0..rect.height).zip(&geometry.reply_lines) {
        put_str(
            buf,
            rect.x + 2,
            top + dy,
            label,
            rect.width.saturating_sub(2),
            text,
        );
    }
}

fn paint_file_card(record: &MessageRecord, style: &BubbleStyle, rect: Rect, buf: &mut Buffer) {
    let card = Style::default()
        .fg(style.reply_text_color)
        .bg(style.file_card_color);
    let inner = if rect.height >= 3 && rect.width >= 4 {
        Block::bordered()
            .border_style(card.fg(style.file_border_color))
            .style(card)
            .render(rect.intersection(buf.area), buf);
        Rect::new(rect.x + 1, rect.y + 1, rect.width - 2, rect.height - 2)
    } else {
        buf.set_style(rect.intersection(buf.area), card);
        rect
    };

    let name = if record.attachment.file_name.is_empty() {
        "file"
    } else {
        record.attachment.file_name.as_str()
    };
    let size = format_size(record.attachment.file_size_bytes);
    let label = if inner.height >= 2 {
        format!("📄 {name}")
    } else {
        format!("📄 {name}  {size}")
    };
    put_str(
        buf,
        inner.x,
        inner.y,
        &truncate_with_ellipsis(&label, inner.width),
        inner.width,
        card,
    );
    if inner.height >= 2 {
        put_str(buf, inner.x, inner.y + 1, &size, inner.width, card);
    }
}

fn paint_image_card(
    record: &MessageRecord,
    style: &BubbleStyle,
    images: &dyn ImageDecoder,
    rect: Rect,
    buf: &mut Buffer,
) {
    if let Some(thumb) = images.thumbnail(&record.attachment.image_path, rect.as_size()) {
        paint_half_blocks(&thumb, rect, buf);
        return;
    }
    let card = Style::default()
        .fg(style.reply_text_color)
        .bg(style.file_card_color);
    buf.set_style(rect.intersection(buf.area), card);
    let label = truncate_with_ellipsis("[Image]", rect.width);
    let x = rect.x + rect.width.saturating_sub(text_width(&label)) / 2;
    let y = rect.y + rect.height.saturating_sub(1) / 2;
    put_str(buf, x, y, &label, rect.width, card);
}

/// `set_stringn` that ignores positions outside the buffer
fn put_str(buf: &mut Buffer, x: u16, y: u16, text: &str, max_width: u16, style: Style) {
    if max_width == 0 || !buf.area.contains(Position { x, y }) {
        return;
    }
    buf.set_stringn(x, y, text, usize::from(max_width), style);
}

fn put_line(buf: &mut Buffer, x: u16, y: u16, line: &Line<'_>, max_width: u16) {
    if max_width == 0 || !buf.area.contains(Position { x, y }) {
        return;
    }
    buf.set_line(x, y, line, max_width);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::{CachedImages, NoImages, PlainRenderer, WrapLayout};
    use crate::tui::widgets::bubble::BubbleLayoutEngine;
    use std::cell::Cell;
    use std::rc::Rc;
    use chatline_core::{Attachment, MessageType, ReactionRecord};

    fn render(record: &MessageRecord, width: u16) -> (BubbleGeometry, Buffer) {
        let style = BubbleStyle::default();
        let engine =
            BubbleLayoutEngine::new(Box::new(PlainRenderer), Box::new(WrapLayout), Box::new(NoImages));
        let (geometry, size) = engine.measure(record, width, &style);
        let area = Rect::new(0, 0, size.width, size.height);
        let mut buf = Buffer::empty(area);
        engine.paint_geometry(record, &geometry, &style, area, &mut buf);
        (geometry, buf)
    }

    fn text_at(buf: &Buffer, x: u16, y: u16, len: u16) -> String {
        (x..x + len).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_fallback_avatar_shows_initial() {
        let record = MessageRecord::text("a", "u1", "hi").with_display_name("Zoe");
        let (g, buf) = render(&record, 60);
        let avatar = g.avatar.unwrap();
        let found = (avatar.y..avatar.bottom())
            .any(|y| (avatar.x..avatar.right()).any(|x| buf[(x, y)].symbol() == "Z"));
        assert!(found);
    }

    #[test]
    fn test_file_card_shows_name_and_size() {
        let record = MessageRecord::text("a", "u1", "")
            .with_type(MessageType::File)
            .with_attachment(Attachment::file("/tmp/r.pdf", "r.pdf", 2048));
        let (g, buf) = render(&record, 80);
        let card = g.attachment.unwrap();
        assert_eq!(text_at(&buf, card.x + 1, card.y + 1, 1), "📄");
        let inside = text_at(&buf, card.x, card.y + 1, card.width);
        assert!(inside.contains("r.pdf"));
        assert!(inside.contains("2.0 KB"));
    }

    #[test]
    fn test_chip_label_is_painted() {
        let record = MessageRecord::text("a", "u1", "nice")
            .with_reactions(vec![ReactionRecord::new("+", 3)]);
        let (g, buf) = render(&record, 80);
        let chip = &g.reactions[0];
        assert_eq!(text_at(&buf, chip.rect.x + 1, chip.rect.y, 3), "+ 3");
    }

    #[test]
    fn test_chip_label_sits_on_middle_row() {
        let record = MessageRecord::text("a", "u1", "nice")
            .with_reactions(vec![ReactionRecord::new("+", 3)]);
        let style = BubbleStyle {
            chip_padding_y: 1,
            ..BubbleStyle::default()
        };
        let engine =
            BubbleLayoutEngine::new(Box::new(PlainRenderer), Box::new(WrapLayout), Box::new(NoImages));
        let (g, size) = engine.measure(&record, 80, &style);
        let area = Rect::new(0, 0, size.width, size.height);
        let mut buf = Buffer::empty(area);
        engine.paint_geometry(&record, &g, &style, area, &mut buf);
        let chip = &g.reactions[0];
        assert_eq!(text_at(&buf, chip.rect.x + 1, chip.rect.y + 1, 3), "+ 3");
        assert_eq!(text_at(&buf, chip.rect.x + 1, chip.rect.y, 3), "   ");
    }

    struct CountingDecoder(Rc<Cell<usize>>);

    impl ImageDecoder for CountingDecoder {
        fn decode(&self, _path: &str) -> Option<image::DynamicImage> {
            self.0.set(self.0.get() + 1);
            Some(image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                8,
                8,
                image::Rgba([200, 10, 10, 255]),
            )))
        }
    }

    #[test]
    fn test_repaint_reuses_decoded_avatar() {
        let decodes = Rc::new(Cell::new(0));
        let engine = BubbleLayoutEngine::new(
            Box::new(PlainRenderer),
            Box::new(WrapLayout),
            Box::new(CachedImages::new(CountingDecoder(Rc::clone(&decodes)))),
        );
        let style = BubbleStyle::default();
        let record = MessageRecord::text("a", "u1", "hi").with_avatar("face.png");
        let (g, size) = engine.measure(&record, 60, &style);
        let area = Rect::new(0, 0, size.width, size.height);

        for _ in 0..2 {
            let mut buf = Buffer::empty(area);
            engine.paint_geometry(&record, &g, &style, area, &mut buf);
            let avatar = g.avatar.unwrap();
            assert_eq!(buf[(avatar.x, avatar.y)].symbol(), "▀");
        }
        assert_eq!(decodes.get(), 1);
    }

    #[test]
    fn test_paint_clips_to_buffer() {
        let record = MessageRecord::text("a", "u1", "clipped").with_display_name("Ann");
        let style = BubbleStyle::default();
        let engine =
            BubbleLayoutEngine::new(Box::new(PlainRenderer), Box::new(WrapLayout), Box::new(NoImages));
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 2));
        engine.paint(&record, &style, Rect::new(0, 0, 40, 8), &mut buf);
        assert_eq!(buf.area, Rect::new(0, 0, 10, 2));
    }
}
