//! Upstream language-model access.

pub mod completion_client;

pub use completion_client::{Completion, CompletionClient, TITLE_INSTRUCTION};
