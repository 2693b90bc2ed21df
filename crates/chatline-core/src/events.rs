//! Synchronous observer plumbing shared by every chatline component

use crate::record::RecordField;
use std::fmt;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E)>;

/// Same-thread event fan-out. Handlers run in subscription order, inside `emit`.
pub struct EventBus<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if the id was unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Change notification emitted by [`crate::MessageStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Everything was replaced
    Reset,
    Inserted { first: usize, count: usize },
    Removed { first: usize, count: usize },
    /// Rows `first..=last` changed in the listed fields only
    Changed {
        first: usize,
        last: usize,
        fields: Vec<RecordField>,
    },
}

/// Events produced by the widgets for the owning controller/service layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageSent(String),
    StopRequested,
    AvatarClicked {
        sender: String,
        is_mine: bool,
        row: usize,
    },
    SelfAvatarClicked {
        sender_id: String,
        row: usize,
    },
    MemberAvatarClicked {
        sender_id: String,
        display_name: String,
        row: usize,
    },
    MessageSelected(String),
    /// Screen position is in terminal cells
    ContextMenuRequested {
        message_id: String,
        column: u16,
        row: u16,
    },
    ActionRequested {
        action: String,
        message_id: String,
    },
    ReactionClicked {
        message_id: String,
        emoji: String,
    },
    DraftChanged(String),
    AttachmentPicked {
        path: String,
        is_image: bool,
    },
    VoiceStartRequested,
    VoiceStopRequested,
    EmojiSelected(String),
    RichTextToggled(bool),
}
