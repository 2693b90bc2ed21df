//! Message composer: text editing, slash commands, attachments, emoji and voice toggles

mod commands;

pub use commands::{
    CommandParseError, ComposerCommand, InputMode, MAX_MENU_ENTRIES, filter_commands,
};

use chatline_core::{ChatEvent, EventBus, SubscriptionId};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, List, ListItem, ListState, StatefulWidget, Widget};
use tracing::debug;
use tui_textarea::{CursorMove, Input, TextArea};

use super::bubble::BubbleStyle;
use crate::tui::render::layout::text_width;

/// Emoji offered by the emoji menu
pub const EMOJI_TABLE: [&str; 10] = ["😀", "😂", "😍", "👍", "🎉", "🔥", "🙏", "✅", "✨", "😅"];

/// Editor lines shown before the composer stops growing
const MAX_VISIBLE_LINES: u16 = 6;

/// Input bar state machine.
///
/// `Idle ↔ Sending` is driven from outside through [`Self::set_sending_state`]; recording and
/// the input mode toggle independently.
#[derive(Debug)]
pub struct ComposerController {
    textarea: TextArea<'static>,
    mode: InputMode,
    sending: bool,
    recording: bool,
    rich_text: bool,
    menu: Vec<ComposerCommand>,
    menu_selected: usize,
    events: EventBus<ChatEvent>,
}

impl Default for ComposerController {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerController {
    pub fn new() -> Self {
        let mut composer = Self {
            textarea: TextArea::default(),
            mode: InputMode::Normal,
            sending: false,
            recording: false,
            rich_text: false,
            menu: Vec::new(),
            menu_selected: 0,
            events: EventBus::new(),
        };
        composer.reset_textarea(Vec::new());
        composer
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&ChatEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_rich_text(&self) -> bool {
        self.rich_text
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn draft_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Replace the draft, leaving the cursor at its end
    pub fn set_draft_text(&mut self, text: &str) {
        if self.draft_text() == text {
            return;
        }
        self.reset_textarea(text.split('\n').map(String::from).collect());
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
        self.text_changed();
    }

    pub fn clear(&mut self) {
        if self.draft_text().is_empty() {
            return;
        }
        self.reset_textarea(Vec::new());
        self.text_changed();
    }

    pub fn set_sending_state(&mut self, sending: bool) {
        if self.sending != sending {
            debug!(target: "chatline::composer", "sending state -> {}", sending);
            self.sending = sending;
            self.refresh_placeholder();
        }
    }

    pub fn placeholder(&self) -> &'static str {
        if self.recording {
            "Recording voice message..."
        } else if self.sending {
            "Generating... press Enter to stop"
        } else {
            match self.mode {
                InputMode::Translate => "Translate mode: type text to translate",
                InputMode::Normal => "Type a message, / for commands",
            }
        }
    }

    /// Returns true when the key was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter if key.modifiers.is_empty() => {
                self.submit();
                true
            }
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.textarea.insert_newline();
                self.text_changed();
                true
            }
            KeyCode::Up if self.menu_visible() => {
                self.menu_selected = self.menu_selected.saturating_sub(1);
                true
            }
            KeyCode::Down if self.menu_visible() => {
                if self.menu_selected + 1 < self.menu.len() {
                    self.menu_selected += 1;
                }
                true
            }
            KeyCode::Tab if self.menu_visible() => {
                if let Some(cmd) = self.selected_command() {
                    self.set_draft_text(&cmd.command_name());
                }
                true
            }
            KeyCode::Esc if self.menu_visible() => {
                self.hide_menu();
                true
            }
            _ => {
                let changed = self.textarea.input(Input::from(key));
                if changed {
                    self.text_changed();
                }
                changed
            }
        }
    }

    /// Enter or the send button. While sending this requests a stop instead.
    pub fn submit(&mut self) {
        if self.sending {
            debug!(target: "chatline::composer", "stop requested");
            self.events.emit(&ChatEvent::StopRequested);
            return;
        }
        let text = self.draft_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Ok(cmd) = trimmed.parse::<ComposerCommand>() {
            self.apply_command(cmd);
            return;
        }
        debug!(target: "chatline::composer", "message sent ({} bytes)", text.len());
        self.events.emit(&ChatEvent::MessageSent(text));
        self.clear();
    }

    pub fn menu_visible(&self) -> bool {
        !self.menu.is_empty()
    }

    pub fn menu_entries(&self) -> &[ComposerCommand] {
        &self.menu
    }

    pub fn menu_selected(&self) -> usize {
        self.menu_selected
    }

    pub fn selected_command(&self) -> Option<ComposerCommand> {
        self.menu.get(self.menu_selected).copied()
    }

    /// A click on popup entry `index`
    pub fn commit_menu_entry(&mut self, index: usize) -> bool {
        match self.menu.get(index).copied() {
            Some(cmd) => {
                self.apply_command(cmd);
                true
            }
            None => false,
        }
    }

    pub fn pick_image(&mut self, path: &str) {
        self.pick_attachment(path, true);
    }

    pub fn pick_file(&mut self, path: &str) {
        self.pick_attachment(path, false);
    }

    /// Insert `emoji` at the cursor
    pub fn pick_emoji(&mut self, emoji: &str) {
        if emoji.is_empty() {
            return;
        }
        self.textarea.insert_str(emoji);
        self.text_changed();
        self.events.emit(&ChatEvent::EmojiSelected(emoji.to_string()));
    }

    pub fn toggle_rich_text(&mut self) -> bool {
        self.rich_text = !self.rich_text;
        self.events.emit(&ChatEvent::RichTextToggled(self.rich_text));
        self.rich_text
    }

    pub fn toggle_recording(&mut self) -> bool {
        self.recording = !self.recording;
        if self.recording {
            self.clear();
            self.hide_menu();
            self.events.emit(&ChatEvent::VoiceStartRequested);
        } else {
            self.events.emit(&ChatEvent::VoiceStopRequested);
        }
        self.refresh_placeholder();
        self.recording
    }

    /// Bordered height for the current draft, between one and six editor lines
    pub fn required_height(&self, max_height: u16) -> u16 {
        let lines = u16::try_from(self.textarea.lines().len()).unwrap_or(u16::MAX);
        (lines.clamp(1, MAX_VISIBLE_LINES) + 2).min(max_height)
    }

    /// Where the command popup goes: directly above `input_area`, at most six rows
    pub fn menu_area(&self, input_area: Rect) -> Option<Rect> {
        if self.menu.is_empty() {
            return None;
        }
        let rows = u16::try_from(self.menu.len()).unwrap_or(u16::MAX).min(6);
        let rows = rows.min(input_area.y);
        if rows == 0 {
            return None;
        }
        let widest = self
            .menu
            .iter()
            .map(|c| text_width(&c.label()))
            .max()
            .unwrap_or(0);
        let width = (widest + 2).min(input_area.width);
        Some(Rect::new(input_area.x, input_area.y - rows, width, rows))
    }

    fn pick_attachment(&mut self, path: &str, is_image: bool) {
        if path.is_empty() {
            return;
        }
        self.events.emit(&ChatEvent::AttachmentPicked {
            path: path.to_string(),
            is_image,
        });
        let label = if is_image { "[Image]" } else { "[File]" };
        self.events
            .emit(&ChatEvent::MessageSent(format!("{label} {path}")));
    }

    fn apply_command(&mut self, cmd: ComposerCommand) {
        debug!(target: "chatline::composer", "switching to {} mode", cmd.mode());
        self.mode = cmd.mode();
        self.clear();
        self.hide_menu();
        self.refresh_placeholder();
    }

    fn hide_menu(&mut self) {
        self.menu.clear();
        self.menu_selected = 0;
    }

    fn text_changed(&mut self) {
        let text = self.draft_text();
        self.menu = filter_commands(&text);
        if self.menu_selected >= self.menu.len() {
            self.menu_selected = 0;
        }
        self.events.emit(&ChatEvent::DraftChanged(text));
    }

    fn reset_textarea(&mut self, lines: Vec<String>) {
        self.textarea = TextArea::from(lines);
        self.textarea.set_cursor_line_style(Style::default());
        self.textarea
            .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        self.refresh_placeholder();
    }

    fn refresh_placeholder(&mut self) {
        let placeholder = self.placeholder();
        self.textarea.set_placeholder_text(placeholder);
    }
}

/// Colours for the composer and its popup
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerStyle {
    pub border: Style,
    pub border_sending: Style,
    pub border_recording: Style,
    pub text: Style,
    pub placeholder: Style,
    pub menu: Style,
    pub menu_selected: Style,
}

impl Default for ComposerStyle {
    fn default() -> Self {
        Self::from_bubble(&BubbleStyle::default())
    }
}

impl ComposerStyle {
    pub fn from_bubble(bubble: &BubbleStyle) -> Self {
        let base = Style::default().bg(bubble.background_color);
        Self {
            border: base.fg(bubble.bubble_border_color),
            border_sending: base.fg(bubble.my_avatar_color),
            border_recording: base.fg(bubble.failed_status_color),
            text: base.fg(bubble.other_text_color),
            placeholder: base.fg(bubble.timestamp_color),
            menu: Style::default()
                .fg(bubble.other_text_color)
                .bg(bubble.system_bubble_color),
            menu_selected: Style::default()
                .fg(bubble.avatar_text_color)
                .bg(bubble.my_avatar_color)
                .add_modifier(Modifier::BOLD),
        }
    }
}

/// Bordered input bar
#[derive(Debug, Clone, Copy)]
pub struct Composer<'a> {
    style: &'a ComposerStyle,
}

impl<'a> Composer<'a> {
    pub fn new(style: &'a ComposerStyle) -> Self {
        Self { style }
    }
}

impl StatefulWidget for Composer<'_> {
    type State = ComposerController;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let border = if state.recording {
            self.style.border_recording
        } else if state.sending {
            self.style.border_sending
        } else {
            self.style.border
        };
        let mut title = vec![Span::styled(format!(" {} ", state.mode), border)];
        if state.recording {
            title.push(Span::styled(" ● REC ", self.style.border_recording));
        }
        if state.rich_text {
            title.push(Span::styled(" rich ", border));
        }
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border)
            .style(self.style.text)
            .title(Line::from(title));
        let inner = block.inner(area);
        block.render(area, buf);

        state.textarea.set_block(Block::default());
        state.textarea.set_style(self.style.text);
        state.textarea.set_placeholder_style(self.style.placeholder);
        Widget::render(&state.textarea, inner, buf);
    }
}

/// Slash-command suggestions; render into [`ComposerController::menu_area`]
#[derive(Debug, Clone, Copy)]
pub struct CommandPopup<'a> {
    style: &'a ComposerStyle,
}

impl<'a> CommandPopup<'a> {
    pub fn new(style: &'a ComposerStyle) -> Self {
        Self { style }
    }
}

impl StatefulWidget for CommandPopup<'_> {
    type State = ComposerController;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if state.menu.is_empty() {
            return;
        }
        Clear.render(area, buf);
        let items: Vec<ListItem> = state
            .menu
            .iter()
            .map(|cmd| ListItem::new(Line::from(format!(" {}", cmd.label()))))
            .collect();
        let mut list_state = ListState::default();
        list_state.select(Some(state.menu_selected));
        let list = List::new(items)
            .style(self.style.menu)
            .highlight_style(self.style.menu_selected);
        StatefulWidget::render(list, area, buf, &mut list_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn composer() -> (ComposerController, Rc<RefCell<Vec<ChatEvent>>>) {
        let mut composer = ComposerController::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        composer.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (composer, log)
    }

    fn type_text(composer: &mut ComposerController, text: &str) {
        for ch in text.chars() {
            composer.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    fn enter(modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(KeyCode::Enter, modifiers)
    }

    fn sent(log: &Rc<RefCell<Vec<ChatEvent>>>) -> Vec<String> {
        log.borrow()
            .iter()
            .filter_map(|e| match e {
                ChatEvent::MessageSent(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_enter_sends_and_clears() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "hi there");
        composer.handle_key(enter(KeyModifiers::NONE));

        assert_eq!(sent(&log), vec!["hi there"]);
        assert_eq!(composer.draft_text(), "");
        // Sending is flipped by the owner, not by the composer
        assert!(!composer.is_sending());
    }

    #[test]
    fn test_blank_input_sends_nothing() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "   ");
        composer.handle_key(enter(KeyModifiers::NONE));
        assert!(sent(&log).is_empty());
        assert_eq!(composer.draft_text(), "   ");
    }

    #[test]
    fn test_modified_enter_inserts_newline() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "a");
        composer.handle_key(enter(KeyModifiers::SHIFT));
        type_text(&mut composer, "b");
        assert_eq!(composer.draft_text(), "a\nb");
        assert!(sent(&log).is_empty());
        assert_eq!(composer.required_height(20), 4);
    }

    #[test]
    fn test_enter_while_sending_requests_stop() {
        let (mut composer, log) = composer();
        composer.set_sending_state(true);
        type_text(&mut composer, "queued");
        composer.handle_key(enter(KeyModifiers::NONE));
        assert!(log.borrow().contains(&ChatEvent::StopRequested));
        assert!(sent(&log).is_empty());
    }

    #[test]
    fn test_command_switches_mode_without_sending() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "/TRANS");
        assert!(composer.menu_visible());
        composer.handle_key(enter(KeyModifiers::NONE));

        assert_eq!(composer.mode(), InputMode::Translate);
        assert_eq!(composer.draft_text(), "");
        assert!(!composer.menu_visible());
        assert!(sent(&log).is_empty());

        composer.set_draft_text("/normal now");
        composer.submit();
        assert_eq!(composer.mode(), InputMode::Normal);
    }

    #[test]
    fn test_menu_filters_and_hides() {
        let (mut composer, _) = composer();
        type_text(&mut composer, "/");
        assert_eq!(composer.menu_entries().len(), 2);
        type_text(&mut composer, "n");
        assert_eq!(composer.menu_entries(), &[ComposerCommand::Normal]);
        type_text(&mut composer, "x");
        assert!(!composer.menu_visible());
    }

    #[test]
    fn test_clicking_menu_entry_commits_command() {
        let (mut composer, _) = composer();
        type_text(&mut composer, "/");
        assert!(composer.commit_menu_entry(0));
        assert_eq!(composer.mode(), InputMode::Translate);
        assert!(!composer.commit_menu_entry(5));
    }

    #[test]
    fn test_tab_completes_selected_command() {
        let (mut composer, _) = composer();
        type_text(&mut composer, "/");
        composer.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        composer.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(composer.draft_text(), "/normal");
    }

    #[test]
    fn test_draft_changes_are_reported() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "ok");
        assert_eq!(
            *log.borrow(),
            vec![
                ChatEvent::DraftChanged("o".to_string()),
                ChatEvent::DraftChanged("ok".to_string())
            ]
        );
    }

    #[test]
    fn test_attachments_emit_sent_messages() {
        let (mut composer, log) = composer();
        composer.pick_image("/tmp/cat.png");
        composer.pick_file("/tmp/doc.pdf");
        composer.pick_file("");
        assert_eq!(sent(&log), vec!["[Image] /tmp/cat.png", "[File] /tmp/doc.pdf"]);
        assert!(log.borrow().contains(&ChatEvent::AttachmentPicked {
            path: "/tmp/cat.png".to_string(),
            is_image: true
        }));
    }

    #[test]
    fn test_emoji_inserted_at_cursor() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "nice ");
        composer.pick_emoji(EMOJI_TABLE[3]);
        assert_eq!(composer.draft_text(), "nice 👍");
        assert!(log.borrow().contains(&ChatEvent::EmojiSelected("👍".to_string())));
    }

    #[test]
    fn test_recording_clears_draft() {
        let (mut composer, log) = composer();
        type_text(&mut composer, "draft");
        assert!(composer.toggle_recording());
        assert_eq!(composer.draft_text(), "");
        assert_eq!(composer.placeholder(), "Recording voice message...");
        assert!(!composer.toggle_recording());
        let log = log.borrow();
        assert!(log.contains(&ChatEvent::VoiceStartRequested));
        assert!(log.contains(&ChatEvent::VoiceStopRequested));
    }

    #[test]
    fn test_rich_text_toggle() {
        let (mut composer, log) = composer();
        assert!(composer.toggle_rich_text());
        assert!(!composer.toggle_rich_text());
        assert_eq!(
            *log.borrow(),
            vec![
                ChatEvent::RichTextToggled(true),
                ChatEvent::RichTextToggled(false)
            ]
        );
    }

    #[test]
    fn test_height_grows_to_six_lines() {
        let (mut composer, _) = composer();
        composer.set_draft_text(&["x"; 10].join("\n"));
        assert_eq!(composer.required_height(40), 8);
        assert_eq!(composer.required_height(5), 5);
    }

    #[test]
    fn test_menu_area_sits_above_input() {
        let (mut composer, _) = composer();
        type_text(&mut composer, "/");
        let area = composer.menu_area(Rect::new(0, 20, 60, 3)).unwrap();
        assert_eq!(area.bottom(), 20);
        assert_eq!(area.height, 2);
    }
}
