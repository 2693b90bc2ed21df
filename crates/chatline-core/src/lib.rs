pub mod events;
pub mod record;
pub mod store;

pub use events::{ChatEvent, EventBus, StoreChange, SubscriptionId};
pub use record::{
    Attachment, HistoryMessage, MessageRecord, MessageStatus, MessageType, ParticipantInfo,
    ReactionRecord, RecordField, ReplyInfo,
};
pub use store::MessageStore;
