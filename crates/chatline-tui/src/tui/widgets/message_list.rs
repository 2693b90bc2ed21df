//! Bridges the message store and the bubble layout engine to a list host

use chatline_core::{ChatEvent, EventBus, MessageStore, SubscriptionId};
use crossterm::event::MouseButton;
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect, Size};
use tracing::debug;

use super::bubble::{BubbleGeometry, BubbleLayoutEngine, BubbleStyle};

/// What a pointer landed on inside a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitRegion {
    AvatarSelf,
    AvatarOther {
        sender_id: String,
        display_name: String,
    },
    ReactionChip {
        emoji: String,
    },
    Body,
    None,
}

/// Commands a virtualized list host offers back to the presenter
pub trait ListHost {
    /// Width rows are laid out at; zero before the first layout pass
    fn row_width(&self) -> u16;
    fn scroll_to_bottom(&mut self);
    /// Drop cached row sizes so the next pass measures everything again
    fn relayout(&mut self);
}

/// Stateless between calls: every size hint, draw and hit test measures the row again.
#[derive(Debug, Default)]
pub struct MessageListPresenter {
    engine: BubbleLayoutEngine,
    style: BubbleStyle,
    /// Bumped whenever a change could alter row sizes
    generation: u64,
    events: EventBus<ChatEvent>,
}

impl MessageListPresenter {
    pub fn new(engine: BubbleLayoutEngine, style: BubbleStyle) -> Self {
        Self {
            engine,
            style,
            generation: 0,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ChatEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn style(&self) -> &BubbleStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: BubbleStyle) {
        if self.style != style {
            self.style = style;
            self.generation += 1;
        }
    }

    pub fn engine(&self) -> &BubbleLayoutEngine {
        &self.engine
    }

    pub fn set_search_keyword(&mut self, keyword: &str) {
        if self.engine.search_keyword() != keyword {
            self.engine.set_search_keyword(keyword);
            self.generation += 1;
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size of row `index` at `width`; zero for rows that do not exist
    pub fn size_hint(&self, store: &MessageStore, index: usize, width: u16) -> Size {
        store
            .get(index)
            .map(|record| self.engine.measure(record, width, &self.style).1)
            .unwrap_or_default()
    }

    pub fn geometry(&self, store: &MessageStore, index: usize, width: u16) -> Option<BubbleGeometry> {
        store
            .get(index)
            .map(|record| self.engine.measure(record, width, &self.style).0)
    }

    /// Paint row `index` into `row_area`
    pub fn draw(&self, store: &MessageStore, index: usize, row_area: Rect, buf: &mut Buffer) {
        if let Some(record) = store.get(index) {
            self.engine.paint(record, &self.style, row_area, buf);
        }
    }

    /// Classify a row-relative position
    pub fn hit_test(
        &self,
        store: &MessageStore,
        index: usize,
        row_width: u16,
        pos: Position,
    ) -> HitRegion {
        let Some(record) = store.get(index) else {
            return HitRegion::None;
        };
        let (geometry, size) = self.engine.measure(record, row_width, &self.style);
        if pos.x >= size.width || pos.y >= size.height {
            return HitRegion::None;
        }
        if geometry.avatar_contains(pos) {
            return if record.is_mine {
                HitRegion::AvatarSelf
            } else {
                HitRegion::AvatarOther {
                    sender_id: record.sender_id.clone(),
                    display_name: record.sender_display_name.clone(),
                }
            };
        }
        if let Some(chip) = geometry.chip_at(pos) {
            return HitRegion::ReactionChip {
                emoji: chip.emoji.clone(),
            };
        }
        HitRegion::Body
    }

    /// Turn a press on row `index` into events. `local` is row-relative, `screen` is where
    /// a context menu would open.
    pub fn handle_click(
        &mut self,
        store: &MessageStore,
        index: usize,
        row_width: u16,
        local: Position,
        screen: Position,
        button: MouseButton,
    ) -> HitRegion {
        let Some(record) = store.get(index) else {
            return HitRegion::None;
        };
        let hit = self.hit_test(store, index, row_width, local);

        match button {
            MouseButton::Right => {
                debug!(target: "chatline::list", "context menu for row {}", index);
                self.events.emit(&ChatEvent::ContextMenuRequested {
                    message_id: record.id.clone(),
                    column: screen.x,
                    row: screen.y,
                });
            }
            MouseButton::Left => match &hit {
                HitRegion::AvatarSelf | HitRegion::AvatarOther { .. } => {
                    self.events.emit(&ChatEvent::AvatarClicked {
                        sender: record.sender_id.clone(),
                        is_mine: record.is_mine,
                        row: index,
                    });
                    if !record.sender_id.is_empty() {
                        let event = if record.is_mine {
                            ChatEvent::SelfAvatarClicked {
                                sender_id: record.sender_id.clone(),
                                row: index,
                            }
                        } else {
                            ChatEvent::MemberAvatarClicked {
                                sender_id: record.sender_id.clone(),
                                display_name: record.sender_display_name.clone(),
                                row: index,
                            }
                        };
                        self.events.emit(&event);
                    }
                }
                HitRegion::ReactionChip { emoji } => {
                    self.events.emit(&ChatEvent::ReactionClicked {
                        message_id: record.id.clone(),
                        emoji: emoji.clone(),
                    });
                    self.select(&record.id);
                }
                HitRegion::Body => self.select(&record.id),
                HitRegion::None => {}
            },
            MouseButton::Middle => {}
        }
        hit
    }

    pub fn scroll_to_bottom(&self, host: &mut dyn ListHost) {
        host.scroll_to_bottom();
    }

    pub fn relayout(&self, host: &mut dyn ListHost) {
        host.relayout();
    }

    fn select(&mut self, id: &str) {
        if !id.is_empty() {
            self.events.emit(&ChatEvent::MessageSelected(id.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::{NoImages, PlainRenderer, WrapLayout};
    use chatline_core::{MessageRecord, ReactionRecord};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn presenter() -> (MessageListPresenter, Rc<RefCell<Vec<ChatEvent>>>) {
        let engine =
            BubbleLayoutEngine::new(Box::new(PlainRenderer), Box::new(WrapLayout), Box::new(NoImages));
        let mut presenter = MessageListPresenter::new(engine, BubbleStyle::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        presenter.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (presenter, log)
    }

    fn store_with(records: Vec<MessageRecord>) -> MessageStore {
        let mut store = MessageStore::default();
        for r in records {
            store.add_message(r);
        }
        store
    }

    #[test]
    fn test_size_hint_for_missing_row_is_zero() {
        let (presenter, _) = presenter();
        let store = MessageStore::default();
        assert_eq!(presenter.size_hint(&store, 3, 80), Size::default());
    }

    #[test]
    fn test_left_click_on_member_avatar() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![
            MessageRecord::text("m1", "u1", "hi").with_display_name("Ann"),
        ]);
        let avatar = presenter.geometry(&store, 0, 80).unwrap().avatar.unwrap();
        let at = Position::new(avatar.x, avatar.y);

        let hit = presenter.handle_click(&store, 0, 80, at, at, MouseButton::Left);
        assert_eq!(
            hit,
            HitRegion::AvatarOther {
                sender_id: "u1".to_string(),
                display_name: "Ann".to_string()
            }
        );
        assert_eq!(
            *log.borrow(),
            vec![
                ChatEvent::AvatarClicked {
                    sender: "u1".to_string(),
                    is_mine: false,
                    row: 0
                },
                ChatEvent::MemberAvatarClicked {
                    sender_id: "u1".to_string(),
                    display_name: "Ann".to_string(),
                    row: 0
                },
            ]
        );
    }

    #[test]
    fn test_left_click_on_own_avatar() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![MessageRecord::text("m1", "me", "hi").with_mine(true)]);
        let avatar = presenter.geometry(&store, 0, 80).unwrap().avatar.unwrap();
        let at = Position::new(avatar.x + 1, avatar.y);

        presenter.handle_click(&store, 0, 80, at, at, MouseButton::Left);
        assert!(log.borrow().contains(&ChatEvent::SelfAvatarClicked {
            sender_id: "me".to_string(),
            row: 0
        }));
    }

    #[test]
    fn test_left_click_on_body_selects() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![MessageRecord::text("m1", "u1", "hello")]);
        let body = presenter.geometry(&store, 0, 80).unwrap().body;
        let at = Position::new(body.x, body.y);

        let hit = presenter.handle_click(&store, 0, 80, at, at, MouseButton::Left);
        assert_eq!(hit, HitRegion::Body);
        assert_eq!(
            *log.borrow(),
            vec![ChatEvent::MessageSelected("m1".to_string())]
        );
    }

    #[test]
    fn test_right_click_requests_context_menu_anywhere() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![MessageRecord::text("m1", "u1", "hello")]);
        let avatar = presenter.geometry(&store, 0, 80).unwrap().avatar.unwrap();
        let local = Position::new(avatar.x, avatar.y);
        let screen = Position::new(30, 12);

        presenter.handle_click(&store, 0, 80, local, screen, MouseButton::Right);
        assert_eq!(
            *log.borrow(),
            vec![ChatEvent::ContextMenuRequested {
                message_id: "m1".to_string(),
                column: 30,
                row: 12
            }]
        );
    }

    #[test]
    fn test_click_on_reaction_chip() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![
            MessageRecord::text("m1", "u1", "party").with_reactions(vec![ReactionRecord::new("🎉", 4)]),
        ]);
        let chip = presenter.geometry(&store, 0, 80).unwrap().reactions[0].rect;
        let at = Position::new(chip.x, chip.y);

        let hit = presenter.handle_click(&store, 0, 80, at, at, MouseButton::Left);
        assert_eq!(
            hit,
            HitRegion::ReactionChip {
                emoji: "🎉".to_string()
            }
        );
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_click_past_row_hits_nothing() {
        let (mut presenter, log) = presenter();
        let store = store_with(vec![MessageRecord::text("m1", "u1", "hello")]);
        let at = Position::new(0, 500);
        let hit = presenter.handle_click(&store, 0, 80, at, at, MouseButton::Left);
        assert_eq!(hit, HitRegion::None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_style_change_bumps_generation() {
        let (mut presenter, _) = presenter();
        presenter.set_style(BubbleStyle::default());
        assert_eq!(presenter.generation(), 0);
        presenter.set_style(BubbleStyle::dark());
        assert_eq!(presenter.generation(), 1);
    }
}
