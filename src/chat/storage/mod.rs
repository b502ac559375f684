//! Persistent storage for conversations and messages.

pub mod conversation_store;
pub mod database;
pub mod message_store;

pub use conversation_store::{ConversationStore, SqliteConversationStore};
pub use database::{StoreFuture, init_schema, open_database, open_in_memory};
pub use message_store::{MessageStore, SqliteMessageStore};
