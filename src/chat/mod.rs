//! Chat subsystem for the Bloom backend.
//!
//! Organized as:
//! - `core`: Configuration, errors and the conversation/message records
//! - `storage`: `SQLite` conversation and message stores
//! - `engine`: Orchestration of a send-chat round around the completion client

pub mod core;
pub mod engine;
pub mod storage;

pub use self::core::{
    AppConfig, ChatError, ChatResult, ChatTurn, CompletionConfig, Conversation, ErrorKind,
    Message, ServerConfig, StorageConfig,
};
pub use engine::{ConversationOrchestrator, SendChatOutcome, SendChatRequest};
pub use storage::{
    ConversationStore, MessageStore, SqliteConversationStore, SqliteMessageStore, open_database,
};
