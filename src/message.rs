//! Message protocol definitions
//!
//! Plain-text, newline-delimited protocol. Outbound chat traffic is a
//! `ChatMessage` rendered as one line; the fixed strings the server sends
//! outside the chat stream live here too.

use std::fmt;

use chrono::{DateTime, Local};

use crate::types::SERVER_NAME;

/// Sent immediately after a connection is accepted
pub const NAME_PROMPT: &str = "Enter your name:";

/// Sent when the requested name is already registered
pub const NAME_TAKEN: &str = "This name is already taken. Please try another one.";

/// Sent after a successful join, one entry per line
pub const WELCOME_BANNER: [&str; 4] = [
    "",
    "=== Welcome to the chat! ===",
    "Commands: /users, /help, /quit",
    "",
];

/// Reply to `/help`
pub const HELP_TEXT: &str = "Available commands:\n\
/users - list users online\n\
/help - show this help\n\
/quit - leave the chat";

/// Reply to an unrecognized `/` command
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help for a list of commands";

/// Kind of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Chat line written by a user
    Text,
    /// System notice (join, leave, user list, help, errors)
    Notice,
}

/// Server → Client chat message
///
/// Immutable once built; cloned once per recipient during fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub kind: MessageKind,
    /// Sender name, or `Server` for notices
    pub from: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    /// A user's chat line
    pub fn text(
        from: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            kind: MessageKind::Text,
            from: from.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// A system notice stamped with the current time
    pub fn notice(content: impl Into<String>) -> Self {
        Self::notice_at(content, Local::now())
    }

    pub fn notice_at(content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            kind: MessageKind::Notice,
            from: SERVER_NAME.to_string(),
            content: content.into(),
            timestamp,
        }
    }
}

/// Renders the wire form without the trailing newline:
/// `[HH:MM:SS] name: content` or `[HH:MM:SS] *** content ***`
impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.timestamp.format("%H:%M:%S");
        match self.kind {
            MessageKind::Text => write!(f, "[{}] {}: {}", time, self.from, self.content),
            MessageKind::Notice => write!(f, "[{}] *** {} ***", time, self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, h, m, s).single().unwrap()
    }

    #[test]
    fn test_text_format() {
        let msg = ChatMessage::text("alice", "hello", at(9, 5, 7));
        assert_eq!(msg.to_string(), "[09:05:07] alice: hello");
    }

    #[test]
    fn test_notice_format() {
        let mut msg = ChatMessage::notice("bob joined");
        msg.timestamp = at(23, 59, 0);
        assert_eq!(msg.to_string(), "[23:59:00] *** bob joined ***");
        assert_eq!(msg.from, "Server");
        assert_eq!(msg.kind, MessageKind::Notice);
    }

    #[test]
    fn test_help_lists_every_command() {
        for cmd in ["/users", "/help", "/quit"] {
            assert!(HELP_TEXT.contains(cmd));
            assert!(WELCOME_BANNER[2].contains(cmd));
        }
    }
}
