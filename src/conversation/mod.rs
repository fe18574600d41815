//! Conversation transcript types
//!
//! The transcript is append-only: turns are pushed, never edited in
//! place. `options` are only meaningful on the most recent assistant
//! message (the presentation layer renders them as buttons).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Selectable answers offered with an assistant turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Binary asset attached to a user turn (product photo).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            options: None,
            attachment: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            options: None,
            attachment: None,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Reference to a binary asset riding on a user message.
///
/// Holds the local file path and display name only; the bytes are read
/// at upload time, never kept in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub path: std::path::PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    /// The options of the latest assistant message, if it is the most
    /// recent turn. Older options are stale and never offered again.
    pub fn active_options(&self) -> Option<&[String]> {
        match self.messages.last() {
            Some(m) if m.role == Role::Assistant => m.options.as_deref(),
            _ => None,
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_is_append_only() {
        let mut conv = Conversation::new();
        conv.add_assistant("어떤 제품인가요?");
        conv.add_user("핸드크림");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::Assistant);
        assert_eq!(conv.messages[1].content, "핸드크림");
    }

    #[test]
    fn test_active_options_only_on_latest_assistant() {
        let mut conv = Conversation::new();
        conv.push(
            Message::assistant("선택해주세요").with_options(vec!["여성".into(), "남성".into()]),
        );
        assert_eq!(conv.active_options().unwrap().len(), 2);

        conv.add_user("여성");
        assert!(conv.active_options().is_none());
    }
}
