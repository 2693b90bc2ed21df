use std::cell::RefCell;
use std::rc::Rc;

use chatline_core::{
    HistoryMessage, MessageRecord, MessageStatus, MessageStore, MessageType, RecordField,
    StoreChange,
};
use chrono::{DateTime, TimeZone, Utc};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

fn record(id: &str, sender: &str, time: DateTime<Utc>) -> MessageRecord {
    MessageRecord::text(id, sender, format!("body of {id}")).with_timestamp(time)
}

fn watch(store: &mut MessageStore) -> Rc<RefCell<Vec<StoreChange>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    store.subscribe(move |change| sink.borrow_mut().push(change.clone()));
    log
}

fn ids(store: &MessageStore) -> Vec<&str> {
    store.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn set_messages_sorts_then_first_occurrence_wins() {
    let mut store = MessageStore::new();
    let log = watch(&mut store);

    store.set_messages(vec![
        record("1", "a", at(10, 0)),
        record("2", "a", at(9, 0)),
        record("1", "a", at(11, 0)),
    ]);

    assert_eq!(ids(&store), vec!["2", "1"]);
    assert_eq!(store.get(1).map(|m| m.timestamp), Some(at(10, 0)));
    assert_eq!(*log.borrow(), vec![StoreChange::Reset]);
}

#[test]
fn set_messages_is_stable_on_equal_timestamps() {
    let mut store = MessageStore::new();
    store.set_messages(vec![
        record("c", "a", at(9, 0)),
        record("", "a", at(8, 0)),
        record("a", "a", at(9, 0)),
        record("b", "a", at(9, 0)),
        record("", "a", at(8, 0)),
    ]);

    assert_eq!(ids(&store), vec!["", "", "c", "a", "b"]);
    let times: Vec<_> = store.iter().map(|m| m.timestamp).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn append_skips_ids_already_present() {
    let mut store = MessageStore::new();
    store.set_messages(vec![record("1", "a", at(9, 0)), record("2", "a", at(9, 1))]);
    let log = watch(&mut store);

    store.append_messages(
        vec![record("2", "a", at(9, 2)), record("3", "a", at(9, 3))],
        false,
    );

    assert_eq!(store.len(), 3);
    assert_eq!(ids(&store), vec!["1", "2", "3"]);
    assert_eq!(
        *log.borrow(),
        vec![StoreChange::Inserted { first: 2, count: 1 }]
    );
}

#[test]
fn identical_status_update_emits_nothing() {
    let mut store = MessageStore::new();
    store.add_message(record("1", "me", at(9, 0)).with_status(MessageStatus::Sent));
    let log = watch(&mut store);

    assert!(!store.update_status("1", MessageStatus::Sent));
    assert!(log.borrow().is_empty());

    assert!(store.update_status("1", MessageStatus::Read));
    assert_eq!(
        *log.borrow(),
        vec![StoreChange::Changed {
            first: 0,
            last: 0,
            fields: vec![RecordField::Status]
        }]
    );
}

#[test]
fn update_is_mine_follows_current_user() {
    let mut store = MessageStore::new();
    store.set_messages(vec![
        record("1", "A", at(9, 0)).with_mine(false),
        record("2", "B", at(9, 1)).with_mine(true),
    ]);
    let log = watch(&mut store);

    store.update_is_mine("A");

    assert!(store.get(0).is_some_and(|m| m.is_mine));
    assert!(store.get(1).is_some_and(|m| !m.is_mine));
    assert_eq!(
        *log.borrow(),
        vec![StoreChange::Changed {
            first: 0,
            last: 1,
            fields: vec![RecordField::IsMine]
        }]
    );
}

#[test]
fn streaming_appends_notify_once_per_chunk() {
    let mut store = MessageStore::new();
    store.add_message(MessageRecord::text("", "", "").with_display_name("AI"));
    let log = watch(&mut store);

    let chunks = ["He", "llo", ", ", "wor", "ld"];
    for chunk in chunks {
        store.append_content_to_last(chunk);
    }

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(0).map(|m| m.body.as_str()), Some("Hello, world"));

    let log = log.borrow();
    assert_eq!(log.len(), chunks.len());
    assert!(log.iter().all(|c| matches!(
        c,
        StoreChange::Changed { first: 0, last: 0, fields } if fields == &[RecordField::Body]
    )));
}

#[test]
fn history_fixture_loads_through_store() {
    let raw = include_str!("fixtures/history.json");
    let history: Vec<HistoryMessage> = serde_json::from_str(raw).unwrap();
    assert_eq!(history.len(), 5);

    let mut store = MessageStore::new();
    store.set_messages(history.into_iter().map(HistoryMessage::into_record).collect());

    assert_eq!(ids(&store), vec!["", "m-1", "m-2", "m-3"]);
    let first = store.get(0).unwrap();
    assert_eq!(first.message_type, MessageType::DateSeparator);

    let alice = store.get(1).unwrap();
    assert_eq!(alice.status, MessageStatus::Read);
    assert_eq!(alice.body, "Morning! Are we still on for the review?");

    let file = store.get(2).unwrap();
    assert!(file.has_attachment());
    assert!(!file.has_image_attachment());
    assert!(file.reply.has_reply());
    assert_eq!(file.attachment.file_size_bytes, 52314);

    assert_eq!(store.get(3).map(|m| m.reactions.len()), Some(1));
}
