use ratatui::layout::{Position, Rect, Size};
use ratatui::text::Line;

/// Which attachment card a bubble shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    File,
}

/// One laid-out reaction chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionChip {
    pub rect: Rect,
    pub emoji: String,
    pub label: String,
    /// Pill corner radius, half the chip height
    pub radius: u16,
}

/// Everything needed to paint and hit-test one row.
///
/// Rectangles are relative to the row's top-left corner. A geometry is only valid for the
/// record, width and style it was measured with; it is recomputed on every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BubbleGeometry {
    pub row_size: Size,
    pub is_mine: bool,
    /// System notices and date separators: a centered pill, no avatar
    pub is_meta: bool,
    pub avatar: Option<Rect>,
    pub name: Option<Rect>,
    pub name_text: String,
    pub bubble: Rect,
    pub reply: Option<Rect>,
    /// Forward label and/or reply quote, already truncated to the block width
    pub reply_lines: Vec<String>,
    pub attachment: Option<Rect>,
    pub attachment_kind: Option<AttachmentKind>,
    pub body: Rect,
    pub body_lines: Vec<Line<'static>>,
    pub reactions: Vec<ReactionChip>,
    /// Chips that did not fit on the single reaction row
    pub hidden_reactions: usize,
    pub timestamp: Option<Rect>,
    pub timestamp_text: String,
    pub status: Option<Rect>,
    pub status_text: String,
}

impl BubbleGeometry {
    pub fn row_rect(&self) -> Rect {
        Rect::new(0, 0, self.row_size.width, self.row_size.height)
    }

    pub fn avatar_contains(&self, pos: Position) -> bool {
        self.avatar.is_some_and(|r| r.contains(pos))
    }

    pub fn chip_at(&self, pos: Position) -> Option<&ReactionChip> {
        self.reactions.iter().find(|chip| chip.rect.contains(pos))
    }
}

/// Move a row-relative rect onto the row's screen position
pub(crate) fn place(rect: Rect, row: Rect) -> Rect {
    Rect::new(
        row.x.saturating_add(rect.x),
        row.y.saturating_add(rect.y),
        rect.width,
        rect.height,
    )
}
