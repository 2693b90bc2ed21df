//! MessageStore - ordered, deduplicated message rows for one conversation

use crate::events::{EventBus, StoreChange, SubscriptionId};
use crate::record::{MessageRecord, MessageStatus, ReactionRecord, RecordField, ReplyInfo};

use std::collections::HashMap;
use tracing::{debug, trace};

/// Storage for the rows of a single conversation.
///
/// Every operation is a silent no-op on a missing id, an out-of-range index or empty input.
/// Mutations notify subscribers synchronously after the state has been updated.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<MessageRecord>,
    /// Non-empty id -> number of rows carrying it
    ids: HashMap<String, usize>,
    /// Revision number for dirty tracking
    revision: u64,
    changes: EventBus<StoreChange>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&StoreChange) + 'static) -> SubscriptionId {
        self.changes.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }

    /// Get current revision number for dirty tracking
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MessageRecord> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&MessageRecord> {
        self.messages.last()
    }

    /// Row index of the first record with `id`
    pub fn find(&self, id: &str) -> Option<usize> {
        if id.is_empty() {
            return None;
        }
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageRecord> + '_ {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[MessageRecord] {
        &self.messages
    }

    /// Replace everything. Input is stably sorted by timestamp, then the first
    /// occurrence of each non-empty id wins.
    pub fn set_messages(&mut self, mut messages: Vec<MessageRecord>) {
        messages.sort_by_key(|m| m.timestamp);

        self.messages.clear();
        self.ids.clear();
        let total = messages.len();
        for message in messages {
            if self.track_new_id(&message.id) {
                self.messages.push(message);
            }
        }
        debug!(
            target: "chatline::store",
            "set_messages: kept {} of {} rows",
            self.messages.len(),
            total
        );
        self.notify(StoreChange::Reset);
    }

    /// Append rows whose non-empty id is not present yet, keeping input order.
    /// With `sort_first` the batch alone is stably sorted by timestamp before filtering.
    pub fn append_messages(&mut self, messages: Vec<MessageRecord>, sort_first: bool) {
        let fresh = self.filter_new(messages, sort_first);
        if fresh.is_empty() {
            return;
        }
        let first = self.messages.len();
        let count = fresh.len();
        self.messages.extend(fresh);
        self.notify(StoreChange::Inserted { first, count });
    }

    /// Same filtering as [`Self::append_messages`], inserted before the first row.
    pub fn prepend_messages(&mut self, messages: Vec<MessageRecord>, sort_first: bool) {
        let fresh = self.filter_new(messages, sort_first);
        if fresh.is_empty() {
            return;
        }
        let count = fresh.len();
        self.messages.splice(0..0, fresh);
        self.notify(StoreChange::Inserted { first: 0, count });
    }

    /// Unconditional single append, used for locally originated messages
    pub fn add_message(&mut self, message: MessageRecord) {
        if !message.id.is_empty() {
            *self.ids.entry(message.id.clone()).or_insert(0) += 1;
        }
        let first = self.messages.len();
        self.messages.push(message);
        self.notify(StoreChange::Inserted { first, count: 1 });
    }

    pub fn update_status(&mut self, id: &str, status: MessageStatus) -> bool {
        self.patch(id, RecordField::Status, |m| {
            if m.status == status {
                return false;
            }
            m.status = status;
            true
        })
    }

    pub fn update_content(&mut self, id: &str, body: &str) -> bool {
        self.patch(id, RecordField::Body, |m| {
            if m.body == body {
                return false;
            }
            body.clone_into(&mut m.body);
            true
        })
    }

    pub fn update_reactions(&mut self, id: &str, reactions: Vec<ReactionRecord>) -> bool {
        self.patch(id, RecordField::Reactions, |m| {
            if m.reactions == reactions {
                return false;
            }
            m.reactions = reactions;
            true
        })
    }

    pub fn update_attachments(
        &mut self,
        id: &str,
        image_path: &str,
        file_path: &str,
        file_name: &str,
        file_size_bytes: u64,
    ) -> bool {
        self.patch(id, RecordField::Attachment, |m| {
            let a = &mut m.attachment;
            if a.image_path == image_path
                && a.file_path == file_path
                && a.file_name == file_name
                && a.file_size_bytes == file_size_bytes
            {
                return false;
            }
            image_path.clone_into(&mut a.image_path);
            file_path.clone_into(&mut a.file_path);
            file_name.clone_into(&mut a.file_name);
            a.file_size_bytes = file_size_bytes;
            true
        })
    }

    pub fn update_reply(&mut self, id: &str, reply: ReplyInfo) -> bool {
        self.patch(id, RecordField::Reply, |m| {
            if m.reply == reply {
                return false;
            }
            m.reply = reply;
            true
        })
    }

    /// Streaming hot path: grow the last row's body
    pub fn append_content_to_last(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let Some(last) = self.messages.last_mut() else {
            return false;
        };
        last.body.push_str(text);
        let row = self.messages.len() - 1;
        trace!(target: "chatline::store", "streamed {} bytes into row {}", text.len(), row);
        self.notify(StoreChange::Changed {
            first: row,
            last: row,
            fields: vec![RecordField::Body],
        });
        true
    }

    /// Recompute `is_mine` for every row with a sender; records without one keep their flag.
    pub fn update_is_mine(&mut self, current_user_id: &str) -> bool {
        let mut changed = false;
        for m in &mut self.messages {
            if m.sender_id.is_empty() {
                continue;
            }
            let mine = m.sender_id == current_user_id;
            if m.is_mine != mine {
                m.is_mine = mine;
                changed = true;
            }
        }
        if changed {
            let last = self.messages.len() - 1;
            self.notify(StoreChange::Changed {
                first: 0,
                last,
                fields: vec![RecordField::IsMine],
            });
        }
        changed
    }

    /// Backfill profile changes onto every row from `sender_id`. Empty values never overwrite.
    pub fn update_participant_info(
        &mut self,
        sender_id: &str,
        display_name: &str,
        avatar_ref: &str,
    ) -> bool {
        if sender_id.is_empty() {
            return false;
        }
        let mut span: Option<(usize, usize)> = None;
        let mut fields = Vec::new();
        for (row, m) in self.messages.iter_mut().enumerate() {
            if m.sender_id != sender_id {
                continue;
            }
            let mut touched = false;
            if !display_name.is_empty() && m.sender_display_name != display_name {
                display_name.clone_into(&mut m.sender_display_name);
                if !fields.contains(&RecordField::SenderDisplayName) {
                    fields.push(RecordField::SenderDisplayName);
                }
                touched = true;
            }
            if !avatar_ref.is_empty() && m.avatar_ref != avatar_ref {
                avatar_ref.clone_into(&mut m.avatar_ref);
                if !fields.contains(&RecordField::AvatarRef) {
                    fields.push(RecordField::AvatarRef);
                }
                touched = true;
            }
            if touched {
                span = Some(span.map_or((row, row), |(first, _)| (first, row)));
            }
        }
        let Some((first, last)) = span else {
            return false;
        };
        self.notify(StoreChange::Changed {
            first,
            last,
            fields,
        });
        true
    }

    pub fn remove_last(&mut self) -> Option<MessageRecord> {
        let removed = self.messages.pop()?;
        self.untrack_id(&removed.id);
        let first = self.messages.len();
        self.notify(StoreChange::Removed { first, count: 1 });
        Some(removed)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<MessageRecord> {
        if index >= self.messages.len() {
            return None;
        }
        let removed = self.messages.remove(index);
        self.untrack_id(&removed.id);
        self.notify(StoreChange::Removed {
            first: index,
            count: 1,
        });
        Some(removed)
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<MessageRecord> {
        let index = self.find(id)?;
        self.remove_at(index)
    }

    pub fn clear(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        self.messages.clear();
        self.ids.clear();
        self.notify(StoreChange::Reset);
    }

    fn filter_new(&mut self, mut messages: Vec<MessageRecord>, sort_first: bool) -> Vec<MessageRecord> {
        if sort_first {
            messages.sort_by_key(|m| m.timestamp);
        }
        let total = messages.len();
        let fresh: Vec<MessageRecord> = messages
            .into_iter()
            .filter(|m| self.track_new_id(&m.id))
            .collect();
        if fresh.len() != total {
            debug!(
                target: "chatline::store",
                "dropped {} duplicate rows",
                total - fresh.len()
            );
        }
        fresh
    }

    /// Register `id` for a bulk insert. False means the row must be dropped.
    fn track_new_id(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return true;
        }
        if self.ids.contains_key(id) {
            return false;
        }
        self.ids.insert(id.to_string(), 1);
        true
    }

    fn untrack_id(&mut self, id: &str) {
        if id.is_empty() {
            return;
        }
        if let Some(count) = self.ids.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.ids.remove(id);
            }
        }
    }

    fn patch(
        &mut self,
        id: &str,
        field: RecordField,
        apply: impl FnOnce(&mut MessageRecord) -> bool,
    ) -> bool {
        let Some(row) = self.find(id) else {
            return false;
        };
        if !apply(&mut self.messages[row]) {
            return false;
        }
        self.notify(StoreChange::Changed {
            first: row,
            last: row,
            fields: vec![field],
        });
        true
    }

    fn notify(&mut self, change: StoreChange) {
        self.revision += 1;
        self.changes.emit(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn msg(id: &str, hour: u32) -> MessageRecord {
        MessageRecord::text(id, "alice", format!("message {id}")).with_timestamp(at(hour, 0))
    }

    fn recorder(store: &mut MessageStore) -> Rc<RefCell<Vec<StoreChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        store.subscribe(move |c| sink.borrow_mut().push(c.clone()));
        log
    }

    #[test]
    fn test_set_messages_keeps_empty_ids() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("", 9), msg("", 9), msg("a", 10)]);
        assert_eq!(store.len(), 3);
        assert!(!store.contains_id(""));
    }

    #[test]
    fn test_prepend_inserts_at_front() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("3", 12)]);
        let log = recorder(&mut store);

        store.prepend_messages(vec![msg("1", 10), msg("2", 11), msg("3", 12)], false);

        let ids: Vec<_> = store.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(
            *log.borrow(),
            vec![StoreChange::Inserted { first: 0, count: 2 }]
        );
    }

    #[test]
    fn test_append_sort_flag_sorts_only_the_batch() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("late", 15)]);

        store.append_messages(vec![msg("b", 11), msg("a", 10)], true);

        let ids: Vec<_> = store.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "a", "b"]);
    }

    #[test]
    fn test_append_drops_duplicates_within_batch() {
        let mut store = MessageStore::new();
        store.append_messages(vec![msg("x", 9), msg("x", 10)], false);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).map(|m| m.timestamp), Some(at(9, 0)));
    }

    #[test]
    fn test_append_of_only_duplicates_is_silent() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("1", 9)]);
        let log = recorder(&mut store);

        store.append_messages(vec![msg("1", 9)], false);
        store.append_messages(Vec::new(), true);

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_add_message_bypasses_dedup() {
        let mut store = MessageStore::new();
        store.add_message(msg("1", 9));
        store.add_message(msg("1", 10));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_last_keeps_shared_id_tracked() {
        let mut store = MessageStore::new();
        store.add_message(msg("dup", 9));
        store.add_message(msg("dup", 10));

        store.remove_last();
        assert!(store.contains_id("dup"));

        store.remove_last();
        assert!(!store.contains_id("dup"));
        assert!(store.remove_last().is_none());
    }

    #[test]
    fn test_remove_at_out_of_range_is_noop() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("1", 9)]);
        let log = recorder(&mut store);

        assert!(store.remove_at(5).is_none());
        assert!(store.remove_by_id("missing").is_none());
        assert!(log.borrow().is_empty());

        assert!(store.remove_by_id("1").is_some());
        assert_eq!(
            *log.borrow(),
            vec![StoreChange::Removed { first: 0, count: 1 }]
        );
        assert!(!store.contains_id("1"));
    }

    #[test]
    fn test_patch_scopes_change_to_one_row() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("1", 9), msg("2", 10)]);
        let log = recorder(&mut store);

        assert!(store.update_reactions("2", vec![ReactionRecord::new("👍", 2)]));
        assert!(store.update_attachments("2", "", "/tmp/r.pdf", "r.pdf", 2048));
        assert!(!store.update_attachments("2", "", "/tmp/r.pdf", "r.pdf", 2048));
        assert!(!store.update_content("missing", "x"));

        assert_eq!(
            *log.borrow(),
            vec![
                StoreChange::Changed {
                    first: 1,
                    last: 1,
                    fields: vec![RecordField::Reactions]
                },
                StoreChange::Changed {
                    first: 1,
                    last: 1,
                    fields: vec![RecordField::Attachment]
                },
            ]
        );
    }

    #[test]
    fn test_update_reply_equality_short_circuit() {
        let mut store = MessageStore::new();
        store.set_messages(vec![msg("1", 9)]);
        let reply = ReplyInfo {
            reply_to_id: "0".to_string(),
            reply_sender_name: "Bob".to_string(),
            ..ReplyInfo::default()
        };
        assert!(store.update_reply("1", reply.clone()));
        assert!(!store.update_reply("1", reply));
    }

    #[test]
    fn test_append_content_to_empty_store_is_noop() {
        let mut store = MessageStore::new();
        let log = recorder(&mut store);
        assert!(!store.append_content_to_last("hi"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_participant_backfill_spans_changed_rows() {
        let mut store = MessageStore::new();
        store.set_messages(vec![
            msg("1", 8),
            MessageRecord::text("2", "bob", "yo").with_timestamp(at(9, 0)),
            msg("3", 10),
            msg("4", 11),
        ]);
        let log = recorder(&mut store);

        assert!(store.update_participant_info("alice", "Alice", ""));
        assert!(!store.update_participant_info("alice", "Alice", ""));
        assert!(!store.update_participant_info("", "Nobody", "n.png"));

        assert_eq!(
            *log.borrow(),
            vec![StoreChange::Changed {
                first: 0,
                last: 3,
                fields: vec![RecordField::SenderDisplayName]
            }]
        );
        assert_eq!(store.get(1).map(|m| m.sender_display_name.as_str()), Some(""));
        assert_eq!(store.get(2).map(|m| m.sender_display_name.as_str()), Some("Alice"));
    }

    #[test]
    fn test_update_is_mine_ignores_senderless_rows() {
        let mut store = MessageStore::new();
        store.add_message(MessageRecord::text("", "", "ai").with_mine(true));
        store.add_message(MessageRecord::text("1", "me", "hi"));

        assert!(store.update_is_mine("me"));
        assert!(store.get(0).is_some_and(|m| m.is_mine));
        assert!(store.get(1).is_some_and(|m| m.is_mine));
        assert!(!store.update_is_mine("me"));
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut store = MessageStore::new();
        let start = store.revision();
        store.add_message(msg("1", 9));
        store.update_status("1", MessageStatus::Sent);
        assert_eq!(store.revision(), start + 1);
        store.clear();
        assert_eq!(store.revision(), start + 2);
        store.clear();
        assert_eq!(store.revision(), start + 2);
    }
}
