//! Conversation orchestration.

pub mod orchestrator;

pub use orchestrator::{
    AUTO_NAME_HISTORY_LEN, ConversationOrchestrator, SendChatOutcome, SendChatRequest,
};
