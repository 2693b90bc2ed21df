//! Reference virtualized host for the message list

use chatline_core::MessageStore;
use crossterm::event::{MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;

use super::clipping::render_clipped;
use super::message_list::{HitRegion, ListHost, MessageListPresenter};

const WHEEL_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    Bottom,
    Row(usize),
}

/// Scroll position in content rows.
///
/// While `user_scrolled` is false the view sticks to the bottom, so new or growing
/// messages stay in sight.
#[derive(Debug, Default)]
pub struct ListScrollState {
    pub offset: usize,
    target: Option<ScrollTarget>,
    /// Sum of all row heights at the last layout pass
    pub total_content_height: usize,
    pub viewport_height: u16,
    pub user_scrolled: bool,
}

impl ListScrollState {
    pub fn scroll_to_bottom(&mut self) {
        self.target = Some(ScrollTarget::Bottom);
        self.user_scrolled = false;
    }

    /// Center row `index` on the next pass
    pub fn scroll_to_row(&mut self, index: usize) {
        self.target = Some(ScrollTarget::Row(index));
        self.user_scrolled = true;
    }

    pub fn scroll_up(&mut self, amount: usize) -> bool {
        self.target = None;
        let previous = self.offset;
        self.offset = self.offset.saturating_sub(amount);
        self.settle(previous)
    }

    pub fn scroll_down(&mut self, amount: usize) -> bool {
        self.target = None;
        let previous = self.offset;
        self.offset = self.offset.saturating_add(amount).min(self.max_offset());
        self.settle(previous)
    }

    pub fn is_at_bottom(&self) -> bool {
        !self.user_scrolled || self.offset >= self.max_offset()
    }

    pub fn max_offset(&self) -> usize {
        self.total_content_height
            .saturating_sub(usize::from(self.viewport_height))
    }

    fn settle(&mut self, previous: usize) -> bool {
        if self.offset == previous {
            return false;
        }
        // Reaching the bottom again re-engages stick-to-bottom
        self.user_scrolled = self.offset < self.max_offset();
        true
    }

    fn resolve(&mut self, row_starts: impl Fn(usize) -> Option<usize>) {
        match self.target.take() {
            Some(ScrollTarget::Bottom) => self.user_scrolled = false,
            Some(ScrollTarget::Row(index)) => {
                if let Some(start) = row_starts(index) {
                    self.offset = start.saturating_sub(usize::from(self.viewport_height) / 2);
                }
            }
            None => {}
        }
        if !self.user_scrolled {
            self.offset = self.max_offset();
        }
        self.offset = self.offset.min(self.max_offset());
    }
}

#[derive(Debug, Clone, Copy)]
struct RowSlot {
    start: usize,
    height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayoutKey {
    revision: u64,
    width: u16,
    generation: u64,
}

/// A screen position resolved to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHit {
    pub index: usize,
    pub row_width: u16,
    /// Position relative to the row's top-left corner
    pub local: Position,
}

/// Asks the presenter for row sizes, keeps their offsets, and draws only the visible rows.
#[derive(Debug, Default)]
pub struct MessageListView {
    state: ListScrollState,
    rows: Vec<RowSlot>,
    layout_key: Option<LayoutKey>,
    area: Rect,
    dirty: bool,
}

impl MessageListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ListScrollState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ListScrollState {
        &mut self.state
    }

    /// Area of the last render
    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn render(
        &mut self,
        store: &MessageStore,
        presenter: &MessageListPresenter,
        area: Rect,
        buf: &mut Buffer,
    ) {
        self.area = area;
        buf.set_style(
            area.intersection(buf.area),
            Style::default().bg(presenter.style().background_color),
        );
        self.sync(store, presenter, area.width);

        self.state.viewport_height = area.height;
        let rows = &self.rows;
        self.state.resolve(|i| rows.get(i).map(|r| r.start));

        let offset = self.state.offset;
        let bottom = offset.saturating_add(usize::from(area.height));
        let first = self
            .rows
            .partition_point(|r| r.start + usize::from(r.height) <= offset);

        for (index, slot) in self.rows.iter().enumerate().skip(first) {
            if slot.start >= bottom {
                break;
            }
            if slot.height == 0 {
                continue;
            }
            let skip = offset.saturating_sub(slot.start);
            let top = slot.start.max(offset);
            let visible_end = (slot.start + usize::from(slot.height)).min(bottom);
            let render_h = visible_end.saturating_sub(top) as u16;
            if render_h == 0 {
                continue;
            }
            let rect = Rect::new(
                area.x,
                area.y + (top - offset) as u16,
                area.width,
                render_h,
            );
            render_clipped(slot.height, skip as u16, rect, buf, |row, b| {
                presenter.draw(store, index, row, b);
            });
        }
    }

    /// Row under a screen position, using the last rendered layout
    pub fn row_at(&self, pos: Position) -> Option<RowHit> {
        if !self.area.contains(pos) {
            return None;
        }
        let content_y = self.state.offset + usize::from(pos.y - self.area.y);
        let index = self
            .rows
            .partition_point(|r| r.start + usize::from(r.height) <= content_y);
        let slot = self.rows.get(index)?;
        if content_y < slot.start {
            return None;
        }
        Some(RowHit {
            index,
            row_width: self.area.width,
            local: Position::new(pos.x - self.area.x, (content_y - slot.start) as u16),
        })
    }

    /// Wheel scrolls the view; presses are forwarded to the presenter for hit-testing.
    pub fn handle_mouse(
        &mut self,
        event: MouseEvent,
        store: &MessageStore,
        presenter: &mut MessageListPresenter,
    ) -> Option<HitRegion> {
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.state.scroll_up(WHEEL_STEP);
                None
            }
            MouseEventKind::ScrollDown => {
                self.state.scroll_down(WHEEL_STEP);
                None
            }
            MouseEventKind::Down(button) => {
                let screen = Position::new(event.column, event.row);
                let hit = self.row_at(screen)?;
                Some(presenter.handle_click(
                    store,
                    hit.index,
                    hit.row_width,
                    hit.local,
                    screen,
                    button,
                ))
            }
            _ => None,
        }
    }

    /// Center row `index` on the next render and stop following new messages
    pub fn scroll_to_row(&mut self, index: usize) {
        self.state.scroll_to_row(index);
    }

    pub fn page_up(&mut self) -> bool {
        let page = usize::from(self.state.viewport_height.max(1));
        self.state.scroll_up(page)
    }

    pub fn page_down(&mut self) -> bool {
        let page = usize::from(self.state.viewport_height.max(1));
        self.state.scroll_down(page)
    }

    fn sync(&mut self, store: &MessageStore, presenter: &MessageListPresenter, width: u16) {
        let key = LayoutKey {
            revision: store.revision(),
            width,
            generation: presenter.generation(),
        };
        if !self.dirty && self.layout_key == Some(key) && self.rows.len() == store.len() {
            return;
        }

        self.rows.clear();
        self.rows.reserve(store.len());
        let mut cursor = 0usize;
        for index in 0..store.len() {
            let height = presenter.size_hint(store, index, width).height;
            self.rows.push(RowSlot {
                start: cursor,
                height,
            });
            cursor = cursor.saturating_add(usize::from(height));
        }
        self.state.total_content_height = cursor;
        self.layout_key = Some(key);
        self.dirty = false;
    }
}

impl ListHost for MessageListView {
    fn row_width(&self) -> u16 {
        self.area.width
    }

    fn scroll_to_bottom(&mut self) {
        self.state.scroll_to_bottom();
    }

    fn relayout(&mut self) {
        self.dirty = true;
    }
}
