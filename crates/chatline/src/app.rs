use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use chatline_core::{ChatEvent, HistoryMessage, MessageRecord};
use chatline_tui::tui::widgets::{
    ConversationEvent, ConversationItem, ConversationList, ConversationListWidget,
};
use chatline_tui::tui::{ChatPanel, Theme, ThemeProvider};
use chrono::{DateTime, Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent};
use eyre::{Result, WrapErr};
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::prelude::Backend;
use ratatui::{Frame, Terminal};
use tracing::{debug, info, warn};

use crate::demo::{self, Conversation};

const TICK_RATE: Duration = Duration::from_millis(50);
const SIDEBAR_WIDTH: u16 = 30;
const NO_SELECTION: &str = "Select a conversation to start chatting";

/// Read a JSON array of history messages
pub fn load_history(path: &Path) -> Result<Vec<HistoryMessage>> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read history from {}", path.display()))?;
    let messages: Vec<HistoryMessage> = serde_json::from_str(&text)
        .wrap_err_with(|| format!("failed to parse history in {}", path.display()))?;
    Ok(messages)
}

fn to_history(record: &MessageRecord) -> HistoryMessage {
    HistoryMessage {
        message_id: record.id.clone(),
        sender_id: record.sender_id.clone(),
        display_name: record.sender_display_name.clone(),
        avatar_path: record.avatar_ref.clone(),
        content: record.body.clone(),
        timestamp: record.timestamp,
        is_mine: record.is_mine,
        message_type: record.message_type,
        status: record.status,
        attachment: record.attachment.clone(),
        reply: record.reply.clone(),
        reactions: record.reactions.clone(),
        mentions: record.mentions.clone(),
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    let Some(time) = time else {
        return String::new();
    };
    let local = time.with_timezone(&Local);
    if local.date_naive() == Local::now().date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%m/%d").to_string()
    }
}

fn sidebar_item(conversation: &Conversation) -> ConversationItem {
    ConversationItem::new(
        conversation.name.clone(),
        conversation.last_message(),
        format_time(conversation.last_time()),
        conversation.avatar_color,
        conversation.unread,
    )
}

pub struct App {
    panel: ChatPanel,
    sidebar: ConversationList,
    conversations: Vec<Conversation>,
    active: Option<usize>,
    themes: ThemeProvider,
    panel_events: Rc<RefCell<Vec<ChatEvent>>>,
    sidebar_events: Rc<RefCell<Vec<ConversationEvent>>>,
    selected_message: Option<String>,
    replies: usize,
    sidebar_area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(themes: ThemeProvider, user_id: &str, conversations: Vec<Conversation>) -> Self {
        let mut panel = ChatPanel::new(themes.current());
        panel.set_current_user(user_id, "", "");
        let panel_events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&panel_events);
        panel.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let mut sidebar = ConversationList::new();
        let sidebar_events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sidebar_events);
        sidebar.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        for conversation in &conversations {
            sidebar.add_item(sidebar_item(conversation));
        }

        panel.set_empty_state_visible(true, NO_SELECTION);
        Self {
            panel,
            sidebar,
            conversations,
            active: None,
            themes,
            panel_events,
            sidebar_events,
            selected_message: None,
            replies: 0,
            sidebar_area: Rect::default(),
            should_quit: false,
        }
    }

    /// Seed the demo conversations, optionally replacing the first history with a JSON file
    pub fn with_demo_data(
        themes: ThemeProvider,
        user_id: &str,
        history: Option<Vec<HistoryMessage>>,
    ) -> Self {
        let mut conversations = demo::conversations(user_id, Utc::now());
        if let (Some(history), Some(first)) = (history, conversations.first_mut()) {
            first.history = history;
        }
        let mut app = Self::new(themes, user_id, conversations);
        if !app.conversations.is_empty() {
            app.open_conversation(0);
        }
        app
    }

    pub fn theme(&self) -> &Theme {
        self.themes.current()
    }

    pub fn panel(&self) -> &ChatPanel {
        &self.panel
    }

    pub fn active_conversation(&self) -> Option<usize> {
        self.active
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<()> {
        info!(target: "chatline::app", "starting event loop");
        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;
            if event::poll(TICK_RATE)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
                    Event::Mouse(mouse) => self.on_mouse(mouse),
                    Event::Paste(text) => self.on_paste(&text),
                    _ => {}
                }
            }
            self.tick();
        }
        info!(target: "chatline::app", "event loop finished");
        Ok(())
    }

    pub fn tick(&mut self) {
        let was_streaming = self.panel.is_streaming();
        if !self.panel.tick() && was_streaming {
            self.sync_active_conversation();
        }
        self.process_events();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('c' | 'q') if ctrl => self.should_quit = true,
            KeyCode::Up if alt => {
                self.sidebar.select_previous();
                self.sidebar.activate_selected();
            }
            KeyCode::Down if alt => {
                self.sidebar.select_next();
                self.sidebar.activate_selected();
            }
            KeyCode::Char('t') if ctrl => self.cycle_theme(),
            KeyCode::Char('r') if ctrl => {
                self.panel.composer_mut().toggle_recording();
                self.panel.dispatch_events();
            }
            KeyCode::Char('e') if ctrl => {
                self.panel.composer_mut().pick_emoji("🙂");
                self.panel.dispatch_events();
            }
            KeyCode::Char('y') if ctrl => self.copy_selected(),
            KeyCode::Char('g') if ctrl => self.jump_to_quoted(),
            _ => {
                self.panel.handle_key(key);
            }
        }
        self.process_events();
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        let pos = Position::new(mouse.column, mouse.row);
        if self.sidebar_area.contains(pos) {
            let item_height = self.themes.current().conversation_list.item_height;
            self.sidebar.handle_mouse(mouse, item_height);
        } else {
            self.panel.handle_mouse(mouse);
        }
        self.process_events();
    }

    fn on_paste(&mut self, text: &str) {
        let mut draft = self.panel.composer().draft_text();
        draft.push_str(text);
        self.panel.composer_mut().set_draft_text(&draft);
        self.panel.dispatch_events();
        self.process_events();
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let [sidebar, chat] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
                .areas(frame.area());
        self.sidebar_area = sidebar;

        let style = &self.themes.current().conversation_list;
        frame.render_stateful_widget(
            ConversationListWidget::new(style),
            sidebar,
            &mut self.sidebar,
        );
        self.panel.render(chat, frame.buffer_mut());
        if let Some(cursor) = self.panel.cursor_position() {
            frame.set_cursor_position(cursor);
        }
    }

    fn process_events(&mut self) {
        let sidebar_events: Vec<ConversationEvent> =
            self.sidebar_events.borrow_mut().drain(..).collect();
        for event in sidebar_events {
            if let ConversationEvent::Activated(row) = event {
                self.open_conversation(row);
            }
        }

        let panel_events: Vec<ChatEvent> = self.panel_events.borrow_mut().drain(..).collect();
        for event in panel_events {
            match event {
                ChatEvent::MessageSent(text) => {
                    debug!(target: "chatline::app", "sent {} chars", text.chars().count());
                    self.sync_active_conversation();
                    let reply = demo::reply_for(self.replies);
                    self.replies += 1;
                    self.panel.start_simulated_streaming(reply, 0);
                }
                ChatEvent::StopRequested => self.sync_active_conversation(),
                ChatEvent::MessageSelected(id) => self.selected_message = Some(id),
                ChatEvent::ReactionClicked { message_id, emoji } => {
                    info!(target: "chatline::app", "reaction {emoji} on {message_id}");
                }
                ChatEvent::AvatarClicked { sender, .. } => {
                    info!(target: "chatline::app", "avatar of {sender} clicked");
                }
                ChatEvent::VoiceStartRequested => {
                    info!(target: "chatline::app", "recording started");
                }
                ChatEvent::VoiceStopRequested => {
                    info!(target: "chatline::app", "recording stopped");
                }
                _ => {}
            }
        }
    }

    /// Save the open conversation, then show `row`
    pub fn open_conversation(&mut self, row: usize) {
        if self.active == Some(row) {
            return;
        }
        let Some(conversation) = self.conversations.get_mut(row) else {
            warn!(target: "chatline::app", "no conversation at row {row}");
            return;
        };
        conversation.unread = 0;
        let history = conversation.history.clone();
        let item = sidebar_item(conversation);

        self.panel.set_sending_state(false);
        self.sync_active_conversation();
        self.active = Some(row);
        self.selected_message = None;
        self.sidebar.update_item(row, item);
        self.sidebar.select(Some(row));
        self.panel.set_empty_state_visible(false, "");
        self.panel.set_history_messages(history, true);
        debug!(target: "chatline::app", "opened conversation {row}");
    }

    fn sync_active_conversation(&mut self) {
        let Some(row) = self.active else {
            return;
        };
        let Some(conversation) = self.conversations.get_mut(row) else {
            return;
        };
        conversation.history = self.panel.store().iter().map(to_history).collect();
        let item = sidebar_item(conversation);
        self.sidebar.update_item(row, item);
    }

    fn cycle_theme(&mut self) {
        let names = self.themes.available_themes();
        if names.is_empty() {
            return;
        }
        let current = &self.themes.current().name;
        let next = names
            .iter()
            .position(|n| n == current)
            .map_or(0, |i| (i + 1) % names.len());
        match self.themes.set_theme_by_name(&names[next]) {
            Ok(_) => {
                self.panel.apply_theme(self.themes.current());
                info!(target: "chatline::app", "theme switched to {}", names[next]);
            }
            Err(e) => warn!(target: "chatline::app", "failed to load theme {}: {e}", names[next]),
        }
    }

    /// Scroll to the message the selected one replies to
    fn jump_to_quoted(&mut self) {
        let Some(target) = self.selected_message.as_deref().and_then(|id| {
            let store = self.panel.store();
            let record = store.get(store.find(id)?)?;
            Some(record.reply.reply_to_id.clone())
        }) else {
            return;
        };
        if target.is_empty() || !self.panel.scroll_to_message(&target) {
            debug!(target: "chatline::app", "no quoted message to jump to");
        }
    }

    fn copy_selected(&mut self) {
        let Some(id) = self.selected_message.clone() else {
            return;
        };
        match self.panel.copy_message(&id) {
            Ok(true) => debug!(target: "chatline::app", "copied message {id}"),
            Ok(false) => debug!(target: "chatline::app", "message {id} is gone"),
            Err(e) => warn!(target: "chatline::app", "copy failed: {e}"),
        }
    }
}
