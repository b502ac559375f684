//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::chat::core::config::AppConfig;
use crate::chat::core::errors::ChatResult;
use crate::chat::engine::ConversationOrchestrator;
use crate::chat::storage::{
    ConversationStore, MessageStore, SqliteConversationStore, SqliteMessageStore,
};
use crate::llm::CompletionClient;

/// Shared application state.
pub struct AppState {
    /// Validated configuration.
    pub config: AppConfig,
    /// Conversation persistence.
    pub conversations: Arc<dyn ConversationStore>,
    /// Message persistence.
    pub messages: Arc<dyn MessageStore>,
    /// Send-chat flow.
    pub orchestrator: ConversationOrchestrator,
}

impl AppState {
    /// Create the state over an opened database.
    ///
    /// # Errors
    /// Returns an error if the completion client cannot be built.
    pub fn new(config: AppConfig, conn: Arc<Connection>) -> ChatResult<Arc<Self>> {
        let conversations: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::new(Arc::clone(&conn)));
        let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(conn));
        let completions = CompletionClient::new(&config.completion)?;
        let orchestrator = ConversationOrchestrator::new(
            &config.completion,
            Arc::clone(&conversations),
            Arc::clone(&messages),
            completions,
        );

        Ok(Arc::new(Self {
            config,
            conversations,
            messages,
            orchestrator,
        }))
    }
}
