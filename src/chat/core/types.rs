//! Conversation and message records.

use serde::{Deserialize, Serialize};

/// Name given to a conversation until it is renamed or auto-named.
pub const DEFAULT_CONVERSATION_NAME: &str = "New Conversation";

/// Role string for user turns.
pub const ROLE_USER: &str = "user";

/// Role string for model replies.
pub const ROLE_ASSISTANT: &str = "assistant";

/// A named, owned thread of messages.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier (decimal string when allocated by the service).
    pub id: String,
    /// Completion model used for this conversation.
    pub model: String,
    /// Display name.
    #[serde(rename = "conversationName")]
    pub name: String,
    /// Owner identifier from the `user-id` header or `user_id` cookie.
    #[serde(rename = "userID")]
    pub owner_id: String,
    /// Creation time in seconds since Unix epoch.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// A stored message row.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Auto-assigned sequence number.
    pub id: i64,
    /// Owning conversation.
    pub conversation_id: String,
    /// Free-form role (`user`, `assistant`, ...).
    pub role: String,
    /// Message text.
    pub content: String,
    /// Insertion time in seconds since Unix epoch.
    pub timestamp: i64,
}

/// A role/content pair as exchanged with the completion API.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Role of the speaker.
    pub role: String,
    /// Turn text.
    pub content: String,
}

impl ChatTurn {
    /// Build a turn from any string-like role and content.
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<Message> for ChatTurn {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
        }
    }
}
