pub mod bubble;
pub mod clipping;
pub mod composer;
pub mod conversation_list;
pub mod list_view;
pub mod message_list;

pub use bubble::{BubbleGeometry, BubbleLayoutEngine, BubbleStyle};
pub use composer::{CommandPopup, Composer, ComposerController, ComposerStyle, InputMode};
pub use conversation_list::{
    ConversationEvent, ConversationItem, ConversationList, ConversationListStyle,
    ConversationListWidget,
};
pub use list_view::{ListScrollState, MessageListView};
pub use message_list::{HitRegion, ListHost, MessageListPresenter};
