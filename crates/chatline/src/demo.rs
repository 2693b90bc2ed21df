//! Seed conversations and canned replies for the demo

use chatline_core::{
    Attachment, HistoryMessage, MessageType, ReactionRecord, ReplyInfo,
};
use chrono::{DateTime, Duration, Utc};
use ratatui::style::Color;

/// One sidebar entry and its history
#[derive(Debug, Clone)]
pub struct Conversation {
    pub name: String,
    pub avatar_color: Color,
    pub unread: u32,
    pub history: Vec<HistoryMessage>,
}

impl Conversation {
    pub fn last_message(&self) -> &str {
        self.history
            .iter()
            .rev()
            .find(|m| m.message_type != MessageType::DateSeparator)
            .map_or("", |m| m.content.as_str())
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|m| m.timestamp)
    }
}

const REPLIES: &[&str] = &[
    "Sure! Here is a quick summary:\n\n- the **store** keeps rows ordered and deduplicated\n- the **layout engine** measures each bubble\n- the list only paints what is visible",
    "That depends on the width of the terminal. Try resizing the window and watch the bubbles reflow.",
    "Use `/trans` to switch to translate mode and `/normal` to switch back.",
    "Done. Anything else?",
];

/// Canned assistant reply, rotating through a small set
pub fn reply_for(turn: usize) -> &'static str {
    REPLIES[turn % REPLIES.len()]
}

fn message(
    id: &str,
    sender: &str,
    name: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> HistoryMessage {
    HistoryMessage {
        message_id: id.to_string(),
        sender_id: sender.to_string(),
        display_name: name.to_string(),
        content: content.to_string(),
        timestamp,
        ..HistoryMessage::default()
    }
}

fn separator(id: &str, timestamp: DateTime<Utc>) -> HistoryMessage {
    HistoryMessage {
        message_id: id.to_string(),
        timestamp,
        message_type: MessageType::DateSeparator,
        ..HistoryMessage::default()
    }
}

pub fn conversations(user_id: &str, now: DateTime<Utc>) -> Vec<Conversation> {
    let yesterday = now - Duration::days(1);
    let minutes = |base: DateTime<Utc>, m: i64| base + Duration::minutes(m);

    let mut team = vec![
        separator("t0", yesterday),
        message("t1", "ann", "Ann", "Morning! Did the release go out?", minutes(yesterday, 1)),
        message(
            "t2",
            user_id,
            "",
            "Yes, **0.3.0** is tagged. Notes are in the usual place.",
            minutes(yesterday, 3),
        ),
        message("t3", "bob", "Bob", "Nice work 🎉", minutes(yesterday, 4)),
        separator("t4", now),
    ];
    let mut screenshot = message("t5", "ann", "Ann", "Here is the dashboard", minutes(now, -30));
    screenshot.message_type = MessageType::Image;
    screenshot.attachment = Attachment::image("assets/dashboard.png");
    team.push(screenshot);
    let mut report = message("t6", "bob", "Bob", "and the full report", minutes(now, -29));
    report.message_type = MessageType::File;
    report.attachment = Attachment::file("reports/q3.pdf", "q3.pdf", 482_133);
    report.reactions = vec![ReactionRecord::new("👍", 2), ReactionRecord::new("👀", 1)];
    team.push(report);
    let mut quoted = message(
        "t7",
        user_id,
        "",
        "Thanks, I'll read it after lunch.",
        minutes(now, -20),
    );
    quoted.reply = ReplyInfo {
        reply_to_id: "t6".to_string(),
        reply_sender_name: "Bob".to_string(),
        reply_preview_text: "and the full report".to_string(),
        ..ReplyInfo::default()
    };
    team.push(quoted);
    let mut mention = message(
        "t8",
        "ann",
        "Ann",
        "@me can you also check the numbers on page 4?",
        minutes(now, -5),
    );
    mention.mentions = vec!["@me".to_string()];
    team.push(mention);

    let assistant = vec![
        message(
            "a1",
            "assistant",
            "Assistant",
            "Hi! Ask me anything. Replies are simulated and stream in a few characters at a time.",
            minutes(now, -60),
        ),
    ];

    let mut forwarded = message(
        "f2",
        "carol",
        "Carol",
        "Lunch menu for the offsite",
        minutes(now, -90),
    );
    forwarded.reply = ReplyInfo {
        is_forwarded: true,
        forwarded_from_name: "Events".to_string(),
        ..ReplyInfo::default()
    };
    let family = vec![
        HistoryMessage {
            message_id: "f1".to_string(),
            content: "Carol joined the conversation".to_string(),
            timestamp: minutes(now, -120),
            message_type: MessageType::System,
            ..HistoryMessage::default()
        },
        forwarded,
    ];

    vec![
        Conversation {
            name: "Team".to_string(),
            avatar_color: Color::Rgb(0, 120, 215),
            unread: 2,
            history: team,
        },
        Conversation {
            name: "Assistant".to_string(),
            avatar_color: Color::Rgb(74, 137, 52),
            unread: 0,
            history: assistant,
        },
        Conversation {
            name: "Carol".to_string(),
            avatar_color: Color::Rgb(200, 120, 40),
            unread: 120,
            history: family,
        },
    ]
}
