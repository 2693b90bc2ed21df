use std::cell::RefCell;
use std::rc::Rc;

use chatline_core::{ChatEvent, HistoryMessage, StoreChange};
use chatline_tui::tui::clipboard::MemoryClipboard;
use chatline_tui::tui::render::{NoImages, PlainRenderer, WrapLayout};
use chatline_tui::tui::widgets::bubble::BubbleLayoutEngine;
use chatline_tui::tui::{ChatPanel, Theme};
use chrono::{DateTime, TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

fn panel() -> ChatPanel {
    ChatPanel::with_parts(
        &Theme::light(),
        BubbleLayoutEngine::new(Box::new(PlainRenderer), Box::new(WrapLayout), Box::new(NoImages)),
        Box::new(MemoryClipboard::new()),
    )
}

fn record_events(panel: &mut ChatPanel) -> Rc<RefCell<Vec<ChatEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    panel.subscribe(move |e| sink.borrow_mut().push(e.clone()));
    log
}

fn type_text(panel: &mut ChatPanel, text: &str) {
    for c in text.chars() {
        panel.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
}

fn enter(panel: &mut ChatPanel) {
    panel.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

fn history(id: &str, sender: &str, name: &str, hour: u32) -> HistoryMessage {
    HistoryMessage {
        message_id: id.to_string(),
        sender_id: sender.to_string(),
        display_name: name.to_string(),
        content: format!("message {id}"),
        timestamp: at(hour),
        ..HistoryMessage::default()
    }
}

#[test]
fn stream_output_is_rejected_while_idle() {
    let mut panel = panel();
    panel.add_message_from("", false, "AI");

    assert!(!panel.stream_output("ignored"));
    panel.set_sending_state(true);
    assert!(panel.stream_output("He"));
    assert!(panel.stream_output("llo"));

    assert_eq!(panel.store().last().unwrap().body, "Hello");
}

#[test]
fn streaming_changes_body_without_changing_row_count() {
    let mut panel = panel();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    panel
        .store_mut()
        .subscribe(move |c| sink.borrow_mut().push(c.clone()));

    panel.start_simulated_streaming("Hello, world", 5);
    assert!(panel.is_sending());
    changes.borrow_mut().clear();

    let mut ticks = 0;
    while panel.tick() {
        ticks += 1;
    }

    assert_eq!(ticks, 3);
    assert_eq!(panel.message_count(), 1);
    assert_eq!(panel.store().last().unwrap().body, "Hello, world");
    assert_eq!(panel.store().last().unwrap().sender_display_name, "AI");
    assert!(!panel.is_sending());
    assert!(!panel.is_streaming());
    assert_eq!(changes.borrow().len(), 3);
    assert!(
        changes
            .borrow()
            .iter()
            .all(|c| matches!(c, StoreChange::Changed { .. }))
    );
}

#[test]
fn stopping_the_sending_state_stops_the_stream() {
    let mut panel = panel();
    panel.start_simulated_streaming("abcdefghij", 0);

    assert!(panel.tick());
    assert_eq!(panel.store().last().unwrap().body, "abc");
    panel.set_sending_state(false);

    assert!(!panel.tick());
    assert_eq!(panel.store().last().unwrap().body, "abc");
}

#[test]
fn enter_during_a_streamed_reply_requests_stop() {
    let mut panel = panel();
    let events = record_events(&mut panel);
    panel.start_simulated_streaming("a long reply", 2);
    assert!(panel.composer().is_sending());

    type_text(&mut panel, "wait");
    enter(&mut panel);

    assert!(!panel.is_sending());
    assert!(!panel.is_streaming());
    assert_eq!(events.borrow().last(), Some(&ChatEvent::StopRequested));
    assert_eq!(panel.composer().draft_text(), "wait");
}

#[test]
fn sent_draft_becomes_own_message_and_latches_sending() {
    let mut panel = panel();
    let events = record_events(&mut panel);

    type_text(&mut panel, "hello");
    enter(&mut panel);

    let last = panel.store().last().unwrap();
    assert_eq!(last.body, "hello");
    assert!(last.is_mine);
    assert_eq!(last.sender_display_name, "Me");
    assert!(panel.is_sending());
    assert!(!panel.composer().is_sending());
    assert!(panel.composer().draft_text().is_empty());
    assert!(
        events
            .borrow()
            .contains(&ChatEvent::MessageSent("hello".to_string()))
    );

    // The composer is still idle, so the next draft goes out too
    type_text(&mut panel, "again");
    enter(&mut panel);
    assert_eq!(panel.message_count(), 2);
    assert_eq!(panel.store().last().unwrap().body, "again");
    assert!(!events.borrow().contains(&ChatEvent::StopRequested));
    assert_eq!(
        events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ChatEvent::MessageSent(_)))
            .count(),
        2
    );
}

#[test]
fn sent_draft_uses_current_user_profile() {
    let mut panel = panel();
    panel.set_current_user("me", "Alice", "/avatars/alice.png");

    type_text(&mut panel, "hi");
    enter(&mut panel);

    let last = panel.store().last().unwrap();
    assert_eq!(last.sender_id, "me");
    assert_eq!(last.sender_display_name, "Alice");
    assert_eq!(last.avatar_ref, "/avatars/alice.png");
    assert!(last.is_mine);
}

#[test]
fn attachment_pick_is_sent_as_message() {
    let mut panel = panel();
    let events = record_events(&mut panel);

    panel.composer_mut().pick_file("/tmp/notes.txt");
    panel.dispatch_events();

    assert_eq!(panel.store().last().unwrap().body, "[File] /tmp/notes.txt");
    assert!(events.borrow().contains(&ChatEvent::AttachmentPicked {
        path: "/tmp/notes.txt".to_string(),
        is_image: false,
    }));
}

#[test]
fn add_message_by_sender_resolves_participants() {
    let mut panel = panel();
    panel.set_current_user_id("me");

    panel.add_message_by_sender("anonymous", "  ", "", "");
    panel.add_message_by_sender("first", "u1", "Ann", "/a.png");
    panel.add_message_by_sender("second", "u1", "", "");
    panel.add_message_by_sender("bare", "u2", "", "");
    panel.add_message_by_sender("mine", "me", "", "");

    let rows: Vec<_> = panel.store().iter().collect();
    assert_eq!(rows[0].sender_display_name, "User");
    assert!(rows[0].sender_id.is_empty());
    assert_eq!(rows[2].sender_display_name, "Ann");
    assert_eq!(rows[2].avatar_ref, "/a.png");
    assert_eq!(rows[3].sender_display_name, "u2");
    assert!(rows[4].is_mine);
    assert!(!rows[1].is_mine);
    assert!(panel.has_participant("u1"));
}

#[test]
fn changing_current_user_recomputes_is_mine() {
    let mut panel = panel();
    panel.add_message_by_sender("a", "u1", "Ann", "");
    panel.add_message_by_sender("b", "u2", "Bob", "");

    panel.set_current_user_id("u2");

    let mine: Vec<bool> = panel.store().iter().map(|m| m.is_mine).collect();
    assert_eq!(mine, vec![false, true]);
}

#[test]
fn update_participant_backfills_existing_messages() {
    let mut panel = panel();
    panel.add_message_by_sender("a", "u1", "Ann", "");
    panel.add_message_by_sender("b", "u2", "Bob", "");
    panel.add_message_by_sender("c", "u1", "", "");

    assert!(panel.update_participant("u1", "Annie", "/annie.png"));

    let names: Vec<&str> = panel
        .store()
        .iter()
        .map(|m| m.sender_display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Annie", "Bob", "Annie"]);
    assert_eq!(panel.participant("u1").unwrap().avatar_ref, "/annie.png");
    assert!(!panel.update_participant("", "x", ""));
}

#[test]
fn history_reset_keeps_only_the_current_user() {
    let mut panel = panel();
    panel.set_current_user("me", "Alice", "");
    panel.upsert_participant("old", "Old Friend", "");

    panel.set_history_messages(
        vec![
            history("2", "u1", "Ann", 10),
            history("1", "me", "", 9),
            history("3", "", "", 11),
        ],
        true,
    );

    assert!(!panel.has_participant("old"));
    assert!(panel.has_participant("me"));
    assert!(panel.has_participant("u1"));

    let rows: Vec<_> = panel.store().iter().collect();
    assert_eq!(rows[0].id, "1");
    assert_eq!(rows[0].sender_display_name, "Alice");
    assert!(rows[0].is_mine);
    assert_eq!(rows[1].sender_display_name, "Ann");
    assert!(!rows[1].is_mine);
    assert_eq!(rows[2].sender_display_name, "User");
}

#[test]
fn history_without_current_user_keeps_flag() {
    let mut panel = panel();
    let mut own = history("1", "u9", "Zed", 9);
    own.is_mine = true;

    panel.set_history_messages(vec![own], false);

    assert!(panel.store().get(0).unwrap().is_mine);
}

#[test]
fn prepend_and_append_history_skip_known_ids() {
    let mut panel = panel();
    panel.set_history_messages(vec![history("5", "u1", "Ann", 12)], true);

    panel.prepend_history_messages(
        vec![history("4", "u1", "", 11), history("3", "u1", "", 10)],
        true,
    );
    panel.append_history_messages(
        vec![history("5", "u1", "", 12), history("6", "u2", "Bob", 13)],
        false,
    );

    let ids: Vec<&str> = panel.store().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4", "5", "6"]);
}

#[test]
fn empty_state_forces_idle_and_blocks_input() {
    let mut panel = panel();
    panel.set_sending_state(true);

    panel.set_empty_state_visible(true, "No conversation selected");

    assert!(panel.is_empty_state_visible());
    assert!(!panel.is_sending());
    assert!(!panel.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));

    let area = Rect::new(0, 0, 40, 9);
    let mut buf = Buffer::empty(area);
    panel.render(area, &mut buf);
    let middle: String = (0..40).map(|x| buf[(x, 4)].symbol().to_string()).collect();
    assert!(middle.contains("No conversation selected"));
    assert!(panel.cursor_position().is_none());
}

#[test]
fn copy_message_uses_clipboard_and_reports_action() {
    let mut panel = panel();
    let events = record_events(&mut panel);
    panel.set_history_messages(vec![history("7", "u1", "Ann", 9)], false);

    assert!(panel.copy_message("7").unwrap());
    assert!(!panel.copy_message("missing").unwrap());

    assert_eq!(
        *events.borrow(),
        vec![ChatEvent::ActionRequested {
            action: "copy".to_string(),
            message_id: "7".to_string(),
        }]
    );
}

#[test]
fn clicking_a_rendered_row_selects_it() {
    let mut panel = panel();
    let events = record_events(&mut panel);
    panel.set_history_messages(vec![history("7", "u1", "Ann", 9)], false);

    let area = Rect::new(0, 0, 60, 20);
    let mut buf = Buffer::empty(area);
    panel.render(area, &mut buf);

    let geometry = panel.presenter().geometry(panel.store(), 0, 60).unwrap();
    let list = panel.view().area();
    // Content shorter than the list starts at its top
    assert!(geometry.row_size.height < list.height);
    let click = MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: list.x + geometry.body.x,
        row: list.y + geometry.body.y,
        modifiers: KeyModifiers::NONE,
    };
    panel.handle_mouse(click);

    assert!(
        events
            .borrow()
            .contains(&ChatEvent::MessageSelected("7".to_string()))
    );
}

#[test]
fn scroll_to_message_brings_an_old_message_into_view() {
    let mut panel = panel();
    let messages = (0..20)
        .map(|i| history(&format!("h{i}"), "u1", "Ann", i))
        .collect();
    panel.set_history_messages(messages, false);

    let area = Rect::new(0, 0, 60, 20);
    let mut buf = Buffer::empty(area);
    panel.render(area, &mut buf);
    let screen = |buf: &Buffer| -> String {
        (0..20)
            .flat_map(|y| (0..60).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect()
    };
    assert!(!screen(&buf).contains("message h2"));

    assert!(panel.scroll_to_message("h2"));
    assert!(!panel.scroll_to_message("missing"));
    panel.render(area, &mut buf);

    assert!(screen(&buf).contains("message h2"));
    assert!(panel.view().state().user_scrolled);
    assert!(panel.view().state().offset < panel.view().state().max_offset());
}
