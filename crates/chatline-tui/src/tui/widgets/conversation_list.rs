//! Conversation sidebar: a filterable list of chats with unread badges

use chatline_core::{EventBus, SubscriptionId};
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::StatefulWidget;
use regex::{Regex, RegexBuilder};
use strum::{Display, EnumIter};
use tracing::debug;

use crate::tui::render::layout::{text_width, truncate_with_ellipsis};

/// One chat in the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationItem {
    pub name: String,
    pub last_message: String,
    pub time: String,
    pub avatar_color: Color,
    pub avatar_path: String,
    pub unread_count: u32,
}

impl ConversationItem {
    pub fn new(
        name: impl Into<String>,
        last_message: impl Into<String>,
        time: impl Into<String>,
        avatar_color: Color,
        unread_count: u32,
    ) -> Self {
        Self {
            name: name.into(),
            last_message: last_message.into(),
            time: time.into(),
            avatar_color,
            avatar_path: String::new(),
            unread_count,
        }
    }

    fn field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Name => &self.name,
            SearchField::LastMessage => &self.last_message,
            SearchField::Time => &self.time,
        }
    }
}

/// Item fields the search filter looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SearchField {
    Name,
    LastMessage,
    Time,
}

/// Notifications from the sidebar. Rows are source rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    Activated(usize),
    SelectionChanged(Option<usize>),
    Removed(usize),
    Renamed { row: usize, name: String },
    SearchTextChanged(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationListStyle {
    /// Rows per item, including the separator line when three or more
    pub item_height: u16,
    pub avatar_width: u16,
    pub background_color: Color,
    pub hover_color: Color,
    pub selected_color: Color,
    pub name_color: Color,
    pub message_color: Color,
    pub time_color: Color,
    pub separator_color: Color,
    pub badge_color: Color,
    pub badge_text_color: Color,
    pub avatar_text_color: Color,
}

impl Default for ConversationListStyle {
    fn default() -> Self {
        Self::light()
    }
}

impl ConversationListStyle {
    pub fn light() -> Self {
        Self {
            item_height: 3,
            avatar_width: 4,
            background_color: Color::Rgb(255, 255, 255),
            hover_color: Color::Rgb(236, 238, 242),
            selected_color: Color::Rgb(220, 224, 230),
            name_color: Color::Rgb(25, 25, 25),
            message_color: Color::Rgb(150, 150, 150),
            time_color: Color::Rgb(180, 180, 180),
            separator_color: Color::Rgb(230, 230, 230),
            badge_color: Color::Rgb(250, 81, 81),
            badge_text_color: Color::Rgb(255, 255, 255),
            avatar_text_color: Color::Rgb(255, 255, 255),
        }
    }

    pub fn dark() -> Self {
        Self {
            background_color: Color::Rgb(30, 30, 30),
            hover_color: Color::Rgb(50, 50, 50),
            selected_color: Color::Rgb(70, 70, 70),
            name_color: Color::Rgb(230, 230, 230),
            message_color: Color::Rgb(150, 150, 150),
            time_color: Color::Rgb(120, 120, 120),
            separator_color: Color::Rgb(60, 60, 60),
            badge_color: Color::Rgb(220, 60, 60),
            ..Self::light()
        }
    }
}

/// Items, the search filter, and selection.
///
/// Public row numbers are source rows (indices into the unfiltered list); the visible list is
/// a mapping over them.
#[derive(Debug)]
pub struct ConversationList {
    items: Vec<ConversationItem>,
    filter_enabled: bool,
    search_text: String,
    case_sensitive: bool,
    search_fields: Vec<SearchField>,
    visible: Vec<usize>,
    selected: Option<usize>,
    hovered: Option<usize>,
    offset: usize,
    area: Rect,
    events: EventBus<ConversationEvent>,
}

impl Default for ConversationList {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationList {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            filter_enabled: false,
            search_text: String::new(),
            case_sensitive: false,
            search_fields: vec![SearchField::Name, SearchField::LastMessage],
            visible: Vec::new(),
            selected: None,
            hovered: None,
            offset: 0,
            area: Rect::default(),
            events: EventBus::new(),
        }
    }

    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&ConversationEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ConversationItem> {
        self.items.get(row)
    }

    pub fn add_item(&mut self, item: ConversationItem) -> usize {
        self.items.push(item);
        self.refilter();
        self.items.len() - 1
    }

    pub fn update_item(&mut self, row: usize, item: ConversationItem) -> bool {
        let Some(slot) = self.items.get_mut(row) else {
            return false;
        };
        *slot = item;
        self.refilter();
        true
    }

    pub fn rename_item(&mut self, row: usize, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(item) = self.items.get_mut(row) else {
            return false;
        };
        item.name = name.to_string();
        self.refilter();
        self.events.emit(&ConversationEvent::Renamed {
            row,
            name: name.to_string(),
        });
        true
    }

    pub fn find_row_by_name(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    pub fn find_rows_by_name(&self, name: &str) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.name == name)
            .map(|(row, _)| row)
            .collect()
    }

    /// Apply `update` to the first item called `name`
    pub fn update_item_by_name(
        &mut self,
        name: &str,
        update: impl FnOnce(&mut ConversationItem),
    ) -> bool {
        let Some(row) = self.find_row_by_name(name) else {
            return false;
        };
        update(&mut self.items[row]);
        self.refilter();
        true
    }

    /// Apply `update` to every item called `name`; returns how many matched
    pub fn update_items_by_name(
        &mut self,
        name: &str,
        mut update: impl FnMut(&mut ConversationItem),
    ) -> usize {
        let mut count = 0;
        for item in self.items.iter_mut().filter(|item| item.name == name) {
            update(item);
            count += 1;
        }
        if count > 0 {
            self.refilter();
        }
        count
    }

    pub fn remove_item(&mut self, row: usize) -> bool {
        if row >= self.items.len() {
            return false;
        }
        self.items.remove(row);
        self.selected = match self.selected {
            Some(s) if s == row => None,
            Some(s) if s > row => Some(s - 1),
            other => other,
        };
        self.hovered = None;
        self.refilter();
        self.events.emit(&ConversationEvent::Removed(row));
        true
    }

    pub fn remove_selected(&mut self) -> bool {
        match self.selected {
            Some(row) => self.remove_item(row),
            None => false,
        }
    }

    pub fn remove_item_by_name(&mut self, name: &str) -> bool {
        match self.find_row_by_name(name) {
            Some(row) => self.remove_item(row),
            None => false,
        }
    }

    pub fn remove_items_by_name(&mut self, name: &str) -> usize {
        let rows = self.find_rows_by_name(name);
        // Back to front so earlier rows keep their numbers
        for row in rows.iter().rev() {
            self.remove_item(*row);
        }
        rows.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.visible.clear();
        self.selected = None;
        self.hovered = None;
        self.offset = 0;
    }

    pub fn enable_search_filtering(&mut self, enabled: bool) {
        if self.filter_enabled != enabled {
            self.filter_enabled = enabled;
            self.refilter();
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.filter_enabled
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: &str) {
        if self.search_text == text {
            return;
        }
        self.search_text = text.to_string();
        self.events
            .emit(&ConversationEvent::SearchTextChanged(self.search_text.clone()));
        self.refilter();
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
        self.refilter();
    }

    /// Fields searched; an empty list restores the default of name and last message
    pub fn set_search_fields(&mut self, fields: Vec<SearchField>) {
        self.search_fields = if fields.is_empty() {
            vec![SearchField::Name, SearchField::LastMessage]
        } else {
            fields
        };
        self.refilter();
    }

    /// Source rows currently shown, in display order
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible
    }

    pub fn source_row(&self, visible_index: usize) -> Option<usize> {
        self.visible.get(visible_index).copied()
    }

    pub fn visible_index(&self, source_row: usize) -> Option<usize> {
        self.visible.iter().position(|row| *row == source_row)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, row: Option<usize>) -> bool {
        let row = row.filter(|r| *r < self.items.len());
        if self.selected == row {
            return false;
        }
        self.selected = row;
        self.events.emit(&ConversationEvent::SelectionChanged(row));
        true
    }

    pub fn select_next(&mut self) -> bool {
        let next = match self.selected.and_then(|row| self.visible_index(row)) {
            Some(i) => self.source_row(i + 1),
            None => self.source_row(0),
        };
        next.is_some_and(|row| self.select(Some(row)))
    }

    pub fn select_previous(&mut self) -> bool {
        let previous = match self.selected.and_then(|row| self.visible_index(row)) {
            Some(i) if i > 0 => self.source_row(i - 1),
            Some(_) => None,
            None => self.visible.last().copied(),
        };
        previous.is_some_and(|row| self.select(Some(row)))
    }

    /// Emit `Activated` for the selected row
    pub fn activate_selected(&mut self) -> bool {
        match self.selected {
            Some(row) => {
                debug!(target: "chatline::conversations", "activated row {}", row);
                self.events.emit(&ConversationEvent::Activated(row));
                true
            }
            None => false,
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Source row under a screen position, using the last rendered layout
    pub fn row_at(&self, pos: Position, item_height: u16) -> Option<usize> {
        if !self.area.contains(pos) || item_height == 0 {
            return None;
        }
        let index = self.offset + usize::from((pos.y - self.area.y) / item_height);
        self.source_row(index)
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, item_height: u16) -> bool {
        let pos = Position::new(event.column, event.row);
        match event.kind {
            MouseEventKind::Moved => {
                let hovered = self.row_at(pos, item_height);
                let changed = self.hovered != hovered;
                self.hovered = hovered;
                changed
            }
            MouseEventKind::Down(MouseButton::Left) => match self.row_at(pos, item_height) {
                Some(row) => {
                    self.select(Some(row));
                    self.activate_selected()
                }
                None => false,
            },
            MouseEventKind::ScrollUp if self.area.contains(pos) => {
                self.offset = self.offset.saturating_sub(1);
                true
            }
            MouseEventKind::ScrollDown if self.area.contains(pos) => {
                if self.offset + 1 < self.visible.len() {
                    self.offset += 1;
                }
                true
            }
            _ => false,
        }
    }

    fn matcher(&self) -> Option<Regex> {
        if !self.filter_enabled || self.search_text.is_empty() {
            return None;
        }
        RegexBuilder::new(&regex::escape(&self.search_text))
            .case_insensitive(!self.case_sensitive)
            .build()
            .ok()
    }

    fn refilter(&mut self) {
        let matcher = self.matcher();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| match &matcher {
                Some(re) => self
                    .search_fields
                    .iter()
                    .any(|field| re.is_match(item.field(*field))),
                None => true,
            })
            .map(|(row, _)| row)
            .collect();
        self.offset = self.offset.min(self.visible.len().saturating_sub(1));
    }

    /// Keep the selected row inside a viewport of `rows` items
    fn scroll_to_selection(&mut self, rows: usize) {
        let Some(index) = self.selected.and_then(|row| self.visible_index(row)) else {
            return;
        };
        if index < self.offset {
            self.offset = index;
        } else if rows > 0 && index >= self.offset + rows {
            self.offset = index + 1 - rows;
        }
    }
}

/// Renders a [`ConversationList`]
#[derive(Debug, Clone, Copy)]
pub struct ConversationListWidget<'a> {
    style: &'a ConversationListStyle,
}

impl<'a> ConversationListWidget<'a> {
    pub fn new(style: &'a ConversationListStyle) -> Self {
        Self { style }
    }
}

impl StatefulWidget for ConversationListWidget<'_> {
    type State = ConversationList;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let area = area.intersection(buf.area);
        state.area = area;
        let style = self.style;
        buf.set_style(area, Style::default().bg(style.background_color));
        let item_height = style.item_height.max(2);
        let rows = usize::from(area.height / item_height);
        state.scroll_to_selection(rows);

        for (slot, &row) in state.visible.iter().skip(state.offset).take(rows).enumerate() {
            let item = &state.items[row];
            let y = area.y + slot as u16 * item_height;
            let bg = if state.selected == Some(row) {
                style.selected_color
            } else if state.hovered == Some(row) {
                style.hover_color
            } else {
                style.background_color
            };
            let content = Rect::new(area.x, y, area.width, 2);
            buf.set_style(content, Style::default().bg(bg));
            render_item(item, style, bg, content, buf);

            if item_height >= 3 {
                let line = "─".repeat(usize::from(area.width));
                buf.set_stringn(
                    area.x,
                    y + 2,
                    line,
                    usize::from(area.width),
                    Style::default()
                        .fg(style.separator_color)
                        .bg(style.background_color),
                );
            }
        }
    }
}

fn render_item(
    item: &ConversationItem,
    style: &ConversationListStyle,
    bg: Color,
    area: Rect,
    buf: &mut Buffer,
) {
    let avatar = Rect::new(area.x + 1, area.y, style.avatar_width.min(area.width), 2);
    buf.set_style(avatar.intersection(buf.area), Style::default().bg(item.avatar_color));
    let initial: String = item.name.chars().next().map(String::from).unwrap_or_default();
    buf.set_stringn(
        avatar.x + avatar.width.saturating_sub(text_width(&initial)) / 2,
        avatar.y,
        &initial,
        usize::from(avatar.width),
        Style::default()
            .fg(style.avatar_text_color)
            .bg(item.avatar_color)
            .add_modifier(Modifier::BOLD),
    );

    let text_x = avatar.right() + 1;
    let right = area.right().saturating_sub(1);
    let text_width_total = right.saturating_sub(text_x);

    let time_w = text_width(&item.time).min(text_width_total);
    let name_room = text_width_total.saturating_sub(time_w + 1);
    buf.set_stringn(
        text_x,
        area.y,
        truncate_with_ellipsis(&item.name, name_room),
        usize::from(name_room),
        Style::default()
            .fg(style.name_color)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    );
    if time_w > 0 {
        buf.set_stringn(
            right - time_w,
            area.y,
            &item.time,
            usize::from(time_w),
            Style::default().fg(style.time_color).bg(bg),
        );
    }

    let badge = badge_label(item.unread_count);
    let badge_w = text_width(&badge).min(text_width_total);
    let message_room = text_width_total.saturating_sub(badge_w + u16::from(badge_w > 0));
    buf.set_stringn(
        text_x,
        area.y + 1,
        truncate_with_ellipsis(&item.last_message, message_room),
        usize::from(message_room),
        Style::default().fg(style.message_color).bg(bg),
    );
    if badge_w > 0 {
        buf.set_stringn(
            right - badge_w,
            area.y + 1,
            &badge,
            usize::from(badge_w),
            Style::default()
                .fg(style.badge_text_color)
                .bg(style.badge_color),
        );
    }
}

fn badge_label(unread: u32) -> String {
    match unread {
        0 => String::new(),
        1..=99 => format!(" {unread} "),
        _ => " 99+ ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn item(name: &str, message: &str) -> ConversationItem {
        ConversationItem::new(name, message, "10:00", Color::Blue, 0)
    }

    fn list() -> ConversationList {
        let mut list = ConversationList::new();
        list.add_item(item("Alice", "see you tomorrow"));
        list.add_item(item("Bob", "Lunch?"));
        list.add_item(item("alice", "another alice"));
        list
    }

    #[test]
    fn test_find_and_update_by_name() {
        let mut list = list();
        assert_eq!(list.find_row_by_name("Alice"), Some(0));
        assert_eq!(list.find_rows_by_name("alice"), vec![2]);
        assert_eq!(list.find_row_by_name("Carol"), None);

        let n = list.update_items_by_name("Bob", |i| i.unread_count = 4);
        assert_eq!(n, 1);
        assert_eq!(list.get(1).unwrap().unread_count, 4);
        assert!(!list.update_item(9, item("x", "y")));
    }

    #[test]
    fn test_filter_is_case_insensitive_literal() {
        let mut list = list();
        list.set_search_text("ALICE");
        // Filtering is off until enabled
        assert_eq!(list.visible_rows(), &[0, 1, 2]);

        list.enable_search_filtering(true);
        assert_eq!(list.visible_rows(), &[0, 2]);
        assert_eq!(list.source_row(1), Some(2));
        assert_eq!(list.visible_index(2), Some(1));

        list.set_case_sensitive(true);
        assert!(list.visible_rows().is_empty());

        list.set_search_text("lunch?");
        list.set_case_sensitive(false);
        assert_eq!(list.visible_rows(), &[1]);

        list.set_search_text("");
        assert_eq!(list.visible_rows().len(), 3);
    }

    #[test]
    fn test_search_fields_are_configurable() {
        let mut list = list();
        list.enable_search_filtering(true);
        list.set_search_fields(vec![SearchField::Name]);
        list.set_search_text("tomorrow");
        assert!(list.visible_rows().is_empty());
    }

    #[test]
    fn test_remove_keeps_selection_on_same_item() {
        let mut list = list();
        list.select(Some(2));
        assert!(list.remove_item(0));
        assert_eq!(list.selected(), Some(1));
        assert_eq!(list.get(1).unwrap().name, "alice");
        assert!(!list.remove_item(7));
    }

    #[test]
    fn test_remove_items_by_name() {
        let mut list = list();
        list.add_item(item("Bob", "again"));
        assert_eq!(list.remove_items_by_name("Bob"), 2);
        assert_eq!(list.len(), 2);
        assert!(!list.remove_item_by_name("Bob"));
    }

    #[test]
    fn test_selection_moves_over_visible_rows() {
        let mut list = list();
        list.enable_search_filtering(true);
        list.set_search_text("alice");
        assert!(list.select_next());
        assert_eq!(list.selected(), Some(0));
        assert!(list.select_next());
        assert_eq!(list.selected(), Some(2));
        assert!(!list.select_next());
        assert!(list.select_previous());
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn test_events() {
        let mut list = list();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        list.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        list.select(Some(1));
        list.activate_selected();
        list.rename_item(1, " Robert ");
        list.remove_item(1);

        assert_eq!(
            *log.borrow(),
            vec![
                ConversationEvent::SelectionChanged(Some(1)),
                ConversationEvent::Activated(1),
                ConversationEvent::Renamed {
                    row: 1,
                    name: "Robert".to_string()
                },
                ConversationEvent::Removed(1),
            ]
        );
    }

    #[test]
    fn test_render_and_click() {
        let mut list = list();
        list.update_items_by_name("Bob", |i| i.unread_count = 120);
        let style = ConversationListStyle::default();
        let area = Rect::new(0, 0, 30, 9);
        let mut buf = Buffer::empty(area);
        ConversationListWidget::new(&style).render(area, &mut buf, &mut list);

        let second_item: String = (0..30).map(|x| buf[(x, 4)].symbol().to_string()).collect();
        assert!(second_item.contains("99+"));

        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 10,
            row: 3,
            modifiers: crossterm::event::KeyModifiers::NONE,
        };
        assert!(list.handle_mouse(click, style.item_height));
        assert_eq!(list.selected(), Some(1));
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label(0), "");
        assert_eq!(badge_label(5), " 5 ");
        assert_eq!(badge_label(100), " 99+ ");
    }
}
