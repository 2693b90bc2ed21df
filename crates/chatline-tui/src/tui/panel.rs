//! ChatPanel - message list, composer and participant table behind one facade
//!
//! The panel owns the store and routes widget events: a sent draft becomes an own message and
//! flips the sending latch, a stop request clears it. Every widget event is re-emitted to the
//! panel's subscribers afterwards, in the order it was produced.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use chatline_core::{
    ChatEvent, EventBus, HistoryMessage, MessageRecord, MessageStore, ParticipantInfo,
    SubscriptionId,
};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Paragraph, StatefulWidget, Widget, Wrap};
use tracing::debug;

use crate::error::Result;
use crate::tui::clipboard::{Clipboard, SystemClipboard};
use crate::tui::theme::Theme;
use crate::tui::widgets::bubble::{BubbleLayoutEngine, BubbleStyle};
use crate::tui::widgets::composer::{CommandPopup, Composer, ComposerController, ComposerStyle};
use crate::tui::widgets::list_view::MessageListView;
use crate::tui::widgets::message_list::{HitRegion, MessageListPresenter};

/// Characters streamed per tick when the caller passes zero
pub const DEFAULT_CHUNK_CHARS: usize = 3;

const ANONYMOUS_NAME: &str = "User";
const OWN_FALLBACK_NAME: &str = "Me";
const STREAMING_NAME: &str = "AI";

/// Pending text of a simulated reply
#[derive(Debug)]
struct SimulatedStream {
    chars: Vec<char>,
    position: usize,
    chunk_chars: usize,
}

impl SimulatedStream {
    fn next_chunk(&mut self) -> Option<String> {
        if self.position >= self.chars.len() {
            return None;
        }
        let end = (self.position + self.chunk_chars).min(self.chars.len());
        let chunk = self.chars[self.position..end].iter().collect();
        self.position = end;
        Some(chunk)
    }
}

/// Screen regions from the last render
#[derive(Debug, Default, Clone, Copy)]
struct PanelLayout {
    list: Rect,
    input: Rect,
    popup: Option<Rect>,
}

pub struct ChatPanel {
    store: MessageStore,
    participants: HashMap<String, ParticipantInfo>,
    current_user_id: String,
    composer: ComposerController,
    composer_style: ComposerStyle,
    presenter: MessageListPresenter,
    view: MessageListView,
    is_sending: bool,
    /// `Some(message)` while the empty state replaces the conversation
    empty_state: Option<String>,
    stream: Option<SimulatedStream>,
    clipboard: Box<dyn Clipboard>,
    inbox: Rc<RefCell<VecDeque<ChatEvent>>>,
    events: EventBus<ChatEvent>,
    layout: PanelLayout,
}

impl std::fmt::Debug for ChatPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPanel")
            .field("messages", &self.store.len())
            .field("participants", &self.participants.len())
            .field("current_user_id", &self.current_user_id)
            .field("is_sending", &self.is_sending)
            .field("empty_state", &self.empty_state)
            .finish_non_exhaustive()
    }
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self::new(&Theme::default())
    }
}

impl ChatPanel {
    pub fn new(theme: &Theme) -> Self {
        Self::with_parts(
            theme,
            BubbleLayoutEngine::default(),
            Box::new(SystemClipboard::new()),
        )
    }

    /// Panel with explicit collaborators, e.g. a headless layout engine and clipboard
    pub fn with_parts(
        theme: &Theme,
        engine: BubbleLayoutEngine,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));

        let mut composer = ComposerController::new();
        let sink = Rc::clone(&inbox);
        composer.subscribe(move |e: &ChatEvent| sink.borrow_mut().push_back(e.clone()));

        let mut presenter = MessageListPresenter::new(engine, theme.bubble.clone());
        let sink = Rc::clone(&inbox);
        presenter.subscribe(move |e: &ChatEvent| sink.borrow_mut().push_back(e.clone()));

        Self {
            store: MessageStore::new(),
            participants: HashMap::new(),
            current_user_id: String::new(),
            composer,
            composer_style: theme.composer_style(),
            presenter,
            view: MessageListView::new(),
            is_sending: false,
            empty_state: None,
            stream: None,
            clipboard,
            inbox,
            events: EventBus::new(),
            layout: PanelLayout::default(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ChatEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Direct store access for patch operations (status, reactions, attachments, ...)
    pub fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    pub fn composer(&self) -> &ComposerController {
        &self.composer
    }

    /// Composer actions (attachments, emoji, toggles). Call [`Self::dispatch_events`]
    /// afterwards so the panel reacts to what the composer emitted.
    pub fn composer_mut(&mut self) -> &mut ComposerController {
        &mut self.composer
    }

    pub fn presenter(&self) -> &MessageListPresenter {
        &self.presenter
    }

    pub fn view(&self) -> &MessageListView {
        &self.view
    }

    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn bubble_style(&self) -> &BubbleStyle {
        self.presenter.style()
    }

    pub fn set_bubble_style(&mut self, style: BubbleStyle) {
        self.composer_style = ComposerStyle::from_bubble(&style);
        self.presenter.set_style(style);
        self.presenter.relayout(&mut self.view);
    }

    pub fn apply_theme(&mut self, theme: &Theme) {
        self.set_bubble_style(theme.bubble.clone());
    }

    // ---- messages ----

    /// Add a message identified by display name only
    pub fn add_message_from(&mut self, content: &str, is_mine: bool, sender_name: &str) {
        let record = MessageRecord {
            body: content.to_string(),
            sender_display_name: sender_name.to_string(),
            is_mine,
            timestamp: Utc::now(),
            ..MessageRecord::default()
        };
        self.store.add_message(record);
    }

    /// Add a message from `sender_id`, merging the profile fields into the participant table
    pub fn add_message_by_sender(
        &mut self,
        content: &str,
        sender_id: &str,
        display_name: &str,
        avatar: &str,
    ) {
        if sender_id.trim().is_empty() {
            let name = if display_name.is_empty() {
                ANONYMOUS_NAME
            } else {
                display_name
            };
            self.add_message_from(content, false, name);
            return;
        }

        let info = self.merge_participant(sender_id, display_name, avatar);
        let name = if info.display_name.is_empty() {
            sender_id.to_string()
        } else {
            info.display_name
        };
        let record = MessageRecord {
            sender_id: sender_id.to_string(),
            sender_display_name: name,
            avatar_ref: info.avatar_ref,
            body: content.to_string(),
            timestamp: Utc::now(),
            is_mine: !self.current_user_id.is_empty() && sender_id == self.current_user_id,
            ..MessageRecord::default()
        };
        self.store.add_message(record);
    }

    /// Append streamed text to the last message. Ignored unless a reply is in progress.
    pub fn stream_output(&mut self, text: &str) -> bool {
        if !self.is_sending {
            debug!(target: "chatline::panel", "dropping streamed text while idle");
            return false;
        }
        self.store.append_content_to_last(text)
    }

    pub fn remove_last_message(&mut self) -> Option<MessageRecord> {
        self.store.remove_last()
    }

    pub fn clear_messages(&mut self) {
        self.store.clear();
    }

    pub fn set_sending_state(&mut self, sending: bool) {
        self.is_sending = sending;
        self.composer.set_sending_state(sending);
        if !sending && self.stream.take().is_some() {
            debug!(target: "chatline::panel", "simulated stream stopped");
        }
    }

    /// Add an empty reply and feed `content` into it, `chunk_chars` characters per [`Self::tick`]
    pub fn start_simulated_streaming(&mut self, content: &str, chunk_chars: usize) {
        let chunk_chars = if chunk_chars == 0 {
            DEFAULT_CHUNK_CHARS
        } else {
            chunk_chars
        };
        self.add_message_from("", false, STREAMING_NAME);
        self.set_sending_state(true);
        self.stream = Some(SimulatedStream {
            chars: content.chars().collect(),
            position: 0,
            chunk_chars,
        });
    }

    /// Advance the simulated stream. Returns whether it is still running.
    pub fn tick(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.next_chunk() {
            Some(chunk) => {
                self.stream_output(&chunk);
                true
            }
            None => {
                self.set_sending_state(false);
                false
            }
        }
    }

    pub fn set_empty_state_visible(&mut self, visible: bool, message: &str) {
        if visible {
            self.empty_state = Some(message.to_string());
            self.set_sending_state(false);
        } else {
            self.empty_state = None;
        }
    }

    pub fn is_empty_state_visible(&self) -> bool {
        self.empty_state.is_some()
    }

    pub fn set_search_keyword(&mut self, keyword: &str) {
        self.presenter.set_search_keyword(keyword);
    }

    /// Center message `id` in the list on the next render. False when it is not loaded.
    pub fn scroll_to_message(&mut self, id: &str) -> bool {
        let Some(row) = self.store.find(id) else {
            return false;
        };
        self.view.scroll_to_row(row);
        true
    }

    /// Copy the body of message `id` and report the action
    pub fn copy_message(&mut self, id: &str) -> Result<bool> {
        let Some(record) = self.store.find(id).and_then(|row| self.store.get(row)) else {
            return Ok(false);
        };
        self.clipboard.set_text(&record.body)?;
        self.events.emit(&ChatEvent::ActionRequested {
            action: "copy".to_string(),
            message_id: id.to_string(),
        });
        Ok(true)
    }

    // ---- participants ----

    pub fn current_user_id(&self) -> &str {
        &self.current_user_id
    }

    pub fn set_current_user_id(&mut self, user_id: &str) {
        if self.current_user_id == user_id {
            return;
        }
        self.current_user_id = user_id.to_string();
        self.store.update_is_mine(user_id);
    }

    pub fn set_current_user(&mut self, user_id: &str, display_name: &str, avatar: &str) {
        if !user_id.trim().is_empty() {
            self.upsert_participant(user_id, display_name, avatar);
        }
        self.set_current_user_id(user_id);
    }

    /// Insert or fully replace a participant entry
    pub fn upsert_participant(&mut self, user_id: &str, display_name: &str, avatar: &str) {
        self.participants.insert(
            user_id.to_string(),
            ParticipantInfo::new(user_id, display_name, avatar),
        );
    }

    /// Merge profile changes and backfill them onto existing messages
    pub fn update_participant(&mut self, user_id: &str, display_name: &str, avatar: &str) -> bool {
        if user_id.trim().is_empty() {
            return false;
        }
        let info = self.merge_participant(user_id, display_name, avatar);
        self.store
            .update_participant_info(user_id, &info.display_name, &info.avatar_ref)
    }

    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        self.participants.remove(user_id).is_some()
    }

    pub fn clear_participants(&mut self) {
        self.participants.clear();
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.contains_key(user_id)
    }

    pub fn participant(&self, user_id: &str) -> Option<&ParticipantInfo> {
        self.participants.get(user_id)
    }

    // ---- history ----

    /// Replace the conversation. With `reset_participants` the table is rebuilt from the
    /// history, keeping only the current user's own entry.
    pub fn set_history_messages(&mut self, messages: Vec<HistoryMessage>, reset_participants: bool) {
        if reset_participants {
            let current = self.participants.remove(&self.current_user_id);
            self.participants.clear();
            if let Some(info) = current {
                self.participants.insert(self.current_user_id.clone(), info);
            }
        }
        let records = self.resolve_history(messages);
        debug!(target: "chatline::panel", "loaded {} history messages", records.len());
        self.store.set_messages(records);
    }

    pub fn append_history_messages(&mut self, messages: Vec<HistoryMessage>, sort_and_dedupe: bool) {
        let records = self.resolve_history(messages);
        self.store.append_messages(records, sort_and_dedupe);
    }

    pub fn prepend_history_messages(
        &mut self,
        messages: Vec<HistoryMessage>,
        sort_and_dedupe: bool,
    ) {
        let records = self.resolve_history(messages);
        self.store.prepend_messages(records, sort_and_dedupe);
    }

    // ---- input ----

    /// Returns true when the key was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.empty_state.is_some() {
            return false;
        }
        let consumed = match key.code {
            KeyCode::PageUp => self.view.page_up(),
            KeyCode::PageDown => self.view.page_down(),
            _ => self.composer.handle_key(key),
        };
        self.dispatch_events();
        consumed
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) -> Option<HitRegion> {
        if self.empty_state.is_some() {
            return None;
        }
        let pos = Position::new(event.column, event.row);
        if let (Some(popup), MouseEventKind::Down(MouseButton::Left)) = (self.layout.popup, event.kind)
        {
            if popup.contains(pos) {
                self.composer
                    .commit_menu_entry(usize::from(pos.y - popup.y));
                self.dispatch_events();
                return None;
            }
        }
        let hit = if self.layout.list.contains(pos)
            || matches!(event.kind, MouseEventKind::ScrollUp | MouseEventKind::ScrollDown)
        {
            self.view
                .handle_mouse(event, &self.store, &mut self.presenter)
        } else {
            None
        };
        self.dispatch_events();
        hit
    }

    /// Route queued widget events, then forward them to subscribers
    pub fn dispatch_events(&mut self) {
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            match &event {
                ChatEvent::MessageSent(text) => self.on_message_sent(text),
                ChatEvent::StopRequested => self.set_sending_state(false),
                _ => {}
            }
            self.events.emit(&event);
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let style = self.presenter.style();
        let background = Style::default().bg(style.background_color);
        buf.set_style(area.intersection(buf.area), background);

        if let Some(message) = &self.empty_state {
            self.layout = PanelLayout::default();
            let [_, middle, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .areas(area);
            Paragraph::new(message.as_str())
                .style(background.fg(style.system_text_color))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(middle, buf);
            return;
        }

        let input_height = self.composer.required_height(area.height / 2).max(3);
        let [list, input] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(area);

        self.view.render(&self.store, &self.presenter, list, buf);
        Composer::new(&self.composer_style).render(input, buf, &mut self.composer);

        let popup = self.composer.menu_area(input);
        if let Some(popup_area) = popup {
            CommandPopup::new(&self.composer_style).render(popup_area, buf, &mut self.composer);
        }
        self.layout = PanelLayout { list, input, popup };
    }

    /// Where the terminal cursor belongs, if the composer is visible
    pub fn cursor_position(&self) -> Option<Position> {
        if self.empty_state.is_some() || self.layout.input.is_empty() {
            return None;
        }
        let (row, col) = self.composer.textarea().cursor();
        let inner_x = self.layout.input.x + 1;
        let inner_y = self.layout.input.y + 1;
        Some(Position::new(
            inner_x.saturating_add(u16::try_from(col).unwrap_or(u16::MAX)),
            inner_y.saturating_add(u16::try_from(row).unwrap_or(u16::MAX)),
        ))
    }

    /// Latches the panel only; the composer stays idle so the next draft can still be sent
    fn on_message_sent(&mut self, text: &str) {
        self.is_sending = true;
        if self.current_user_id.is_empty() {
            self.add_message_from(text, true, OWN_FALLBACK_NAME);
        } else {
            let user_id = self.current_user_id.clone();
            self.add_message_by_sender(text, &user_id, "", "");
        }
        self.presenter.scroll_to_bottom(&mut self.view);
    }

    fn merge_participant(
        &mut self,
        user_id: &str,
        display_name: &str,
        avatar: &str,
    ) -> ParticipantInfo {
        let info = self
            .participants
            .entry(user_id.to_string())
            .or_insert_with(|| ParticipantInfo::new(user_id, "", ""));
        info.merge(display_name, avatar);
        info.clone()
    }

    fn resolve_history(&mut self, messages: Vec<HistoryMessage>) -> Vec<MessageRecord> {
        let mut records = Vec::with_capacity(messages.len());
        for history in messages {
            if history.sender_id.trim().is_empty() {
                let mut record = history.into_record();
                record.sender_id.clear();
                if record.sender_display_name.is_empty() {
                    record.sender_display_name = ANONYMOUS_NAME.to_string();
                }
                records.push(record);
                continue;
            }

            let info = self.merge_participant(
                &history.sender_id,
                &history.display_name,
                &history.avatar_path,
            );
            let is_mine = if self.current_user_id.is_empty() {
                history.is_mine
            } else {
                history.sender_id == self.current_user_id
            };
            let mut record = history.into_record();
            record.sender_display_name = if info.display_name.is_empty() {
                record.sender_id.clone()
            } else {
                info.display_name
            };
            record.avatar_ref = info.avatar_ref;
            record.is_mine = is_mine;
            records.push(record);
        }
        records
    }
}
