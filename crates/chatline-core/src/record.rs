//! Value types for a single chat message and the people who send them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Kind of content a message row carries
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    System,
    DateSeparator,
}

impl MessageType {
    /// System notices and date separators render as a centered pill without a bubble.
    pub fn is_meta(self) -> bool {
        matches!(self, MessageType::System | MessageType::DateSeparator)
    }
}

/// Delivery state; only meaningful for the current user's own messages
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    #[default]
    Sent,
    Failed,
    Read,
}

/// One emoji reaction with its tally
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub emoji: String,
    pub count: u32,
}

impl ReactionRecord {
    pub fn new(emoji: impl Into<String>, count: u32) -> Self {
        Self {
            emoji: emoji.into(),
            count,
        }
    }

    /// Text shown inside the reaction chip, e.g. `👍 3`
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.count)
    }
}

/// Image or file attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub image_path: String,
    pub file_path: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}

impl Attachment {
    pub fn image(path: impl Into<String>) -> Self {
        Self {
            image_path: path.into(),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            file_path: path.into(),
            file_name: name.into(),
            file_size_bytes: size,
            ..Self::default()
        }
    }
}

/// Reply quote and forward attribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyInfo {
    pub reply_to_id: String,
    pub reply_sender_name: String,
    pub reply_preview_text: String,
    pub is_forwarded: bool,
    pub forwarded_from_name: String,
}

impl ReplyInfo {
    pub fn has_reply(&self) -> bool {
        !self.reply_sender_name.is_empty()
            || !self.reply_preview_text.is_empty()
            || !self.reply_to_id.is_empty()
    }

    /// Whether the quote block above the body needs to be drawn at all
    pub fn is_present(&self) -> bool {
        self.has_reply() || self.is_forwarded
    }
}

/// Full state of one chat message at its current revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageRecord {
    /// Empty means the message has not been assigned a server id yet
    pub id: String,
    /// Empty means anonymous or system
    pub sender_id: String,
    pub sender_display_name: String,
    pub avatar_ref: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub is_mine: bool,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub attachment: Attachment,
    pub reply: ReplyInfo,
    pub reactions: Vec<ReactionRecord>,
    pub mentions: Vec<String>,
}

impl MessageRecord {
    /// Plain text message from `sender_id`
    pub fn text(id: impl Into<String>, sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Centered system notice
    pub fn system(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            message_type: MessageType::System,
            ..Self::default()
        }
    }

    /// Date separator; an empty body renders the formatted timestamp instead
    pub fn date_separator(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            message_type: MessageType::DateSeparator,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.sender_display_name = name.into();
        self
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = avatar_ref.into();
        self
    }

    pub fn with_mine(mut self, is_mine: bool) -> Self {
        self.is_mine = is_mine;
        self
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn with_reply(mut self, reply: ReplyInfo) -> Self {
        self.reply = reply;
        self
    }

    pub fn with_reactions(mut self, reactions: Vec<ReactionRecord>) -> Self {
        self.reactions = reactions;
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn is_meta(&self) -> bool {
        self.message_type.is_meta()
    }

    pub fn has_attachment(&self) -> bool {
        !self.attachment.image_path.is_empty()
            || !self.attachment.file_name.is_empty()
            || matches!(self.message_type, MessageType::Image | MessageType::File)
    }

    /// Image attachments win over files when both are set, unless the type says File.
    pub fn has_image_attachment(&self) -> bool {
        match self.message_type {
            MessageType::Image => true,
            MessageType::File => false,
            _ => !self.attachment.image_path.is_empty(),
        }
    }

    /// Own messages never show a name header
    pub fn shows_sender_name(&self) -> bool {
        !self.is_mine && !self.sender_id.is_empty() && !self.sender_display_name.is_empty()
    }

    /// Single character drawn inside the fallback avatar
    pub fn avatar_initial(&self) -> String {
        match self.sender_display_name.chars().next() {
            Some(c) => c.to_string(),
            None if self.is_mine => "Me".to_string(),
            None => "U".to_string(),
        }
    }
}

/// Fields a patch operation can touch, carried by change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RecordField {
    Body,
    Status,
    Reactions,
    Attachment,
    Reply,
    IsMine,
    SenderDisplayName,
    AvatarRef,
}

/// Profile side-table entry keyed by sender id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantInfo {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: String,
}

impl ParticipantInfo {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_ref: avatar_ref.into(),
        }
    }

    /// Overwrite only with non-empty values
    pub fn merge(&mut self, display_name: &str, avatar_ref: &str) {
        if !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        if !avatar_ref.is_empty() {
            self.avatar_ref = avatar_ref.to_string();
        }
    }
}

/// Message as loaded from history, before participant resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryMessage {
    pub message_id: String,
    pub sender_id: String,
    pub display_name: String,
    pub avatar_path: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_mine: bool,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub attachment: Attachment,
    pub reply: ReplyInfo,
    pub reactions: Vec<ReactionRecord>,
    pub mentions: Vec<String>,
}

impl HistoryMessage {
    /// Carry every payload field over; sender resolution is left to the caller.
    pub fn into_record(self) -> MessageRecord {
        MessageRecord {
            id: self.message_id,
            sender_id: self.sender_id,
            sender_display_name: self.display_name,
            avatar_ref: self.avatar_path,
            body: self.content,
            timestamp: self.timestamp,
            is_mine: self.is_mine,
            message_type: self.message_type,
            status: self.status,
            attachment: self.attachment,
            reply: self.reply,
            reactions: self.reactions,
            mentions: self.mentions,
        }
    }
}
