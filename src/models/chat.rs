use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Ordered message history for one session. Append-only, except that the
/// trailing entry may have its content replaced while a reply streams in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replaces the final entry's content, keeping its role and original
    /// timestamp. No-op when the conversation is empty.
    pub fn update_last(&mut self, content: &str) {
        if let Some(last) = self.messages.last_mut() {
            *last = ChatMessage {
                role: last.role,
                content: content.to_string(),
                timestamp: last.timestamp,
            };
        }
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_last_on_empty_conversation_is_noop() {
        let mut conversation = Conversation::new();
        conversation.update_last("hello");
        assert!(conversation.is_empty());
    }

    #[test]
    fn update_last_preserves_role_and_timestamp() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::new(Role::User, "hi"));
        conversation.push(ChatMessage {
            role: Role::Assistant,
            content: String::new(),
            timestamp: 1234,
        });

        conversation.update_last("partial reply");

        let last = conversation.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "partial reply");
        assert_eq!(last.timestamp, 1234);
        // Earlier entries untouched.
        assert_eq!(conversation.messages[0].content, "hi");
    }

    #[test]
    fn push_preserves_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::new(Role::User, "first"));
        conversation.push(ChatMessage::new(Role::Assistant, "second"));
        conversation.push(ChatMessage::new(Role::User, "third"));

        let contents: Vec<&str> = conversation
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn role_serializes_lowercase() {
        let message = ChatMessage {
            role: Role::Assistant,
            content: "ok".to_string(),
            timestamp: 0,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
