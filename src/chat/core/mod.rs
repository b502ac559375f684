//! Core chat types, configuration and errors.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{AppConfig, CompletionConfig, ServerConfig, StorageConfig};
pub use errors::{ChatError, ChatResult, ErrorKind};
pub use types::{
    ChatTurn, Conversation, DEFAULT_CONVERSATION_NAME, Message, ROLE_ASSISTANT, ROLE_USER,
};
