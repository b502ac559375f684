//! Completion orchestration around the conversation and message stores.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::chat::core::config::CompletionConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::types::ChatTurn;
use crate::chat::storage::{ConversationStore, MessageStore};
use crate::llm::CompletionClient;

/// History length, counted after the new user turn, that triggers auto-naming.
///
/// Three entries means user, assistant, user: the second exchange.
pub const AUTO_NAME_HISTORY_LEN: usize = 3;

/// An inbound user turn.
#[derive(Clone, Debug, Default)]
pub struct SendChatRequest {
    /// Role of the sender, normally `user`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// Target conversation; a new one is allocated when absent.
    pub conversation_id: Option<String>,
    /// Model name; the configured default is used when absent.
    pub model: Option<String>,
}

/// Result of one send-chat round.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendChatOutcome {
    /// Conversation the turn was appended to.
    pub conversation_id: String,
    /// Role of the reply.
    pub role: String,
    /// Reply text.
    pub content: String,
    /// Upstream creation time of the reply.
    pub created: i64,
    /// New conversation name when auto-naming ran on this request.
    pub conversation_name: Option<String>,
}

/// Sequences store reads and writes around completion calls.
pub struct ConversationOrchestrator {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    completions: CompletionClient,
    default_model: String,
}

impl ConversationOrchestrator {
    /// Create an orchestrator over the given stores and client.
    #[must_use]
    pub fn new(
        config: &CompletionConfig,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        completions: CompletionClient,
    ) -> Self {
        Self {
            conversations,
            messages,
            completions,
            default_model: config.default_model.clone(),
        }
    }

    /// Append a user turn, fetch the completion and persist the reply.
    ///
    /// The user turn is stored before the upstream call, so an upstream
    /// failure leaves it persisted without a reply.
    ///
    /// # Errors
    /// Returns `Validation` for a blank role or content, otherwise the first
    /// storage or upstream error encountered.
    pub async fn send_chat(
        &self,
        owner_id: &str,
        request: SendChatRequest,
    ) -> ChatResult<SendChatOutcome> {
        if request.role.trim().is_empty() || request.content.trim().is_empty() {
            return Err(ChatError::Validation(
                "role and content are required".to_string(),
            ));
        }

        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let conversation_id = match request.conversation_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                self.conversations
                    .ensure_conversation(&id, &model, owner_id)
                    .await?
            }
            None => self.conversations.create_next(&model, owner_id).await?.id,
        };

        let mut history: Vec<ChatTurn> = self
            .messages
            .list_by_conversation(&conversation_id)
            .await?
            .into_iter()
            .map(ChatTurn::from)
            .collect();
        history.push(ChatTurn::new(request.role.as_str(), request.content.as_str()));

        let user_ts = Utc::now().timestamp();
        self.messages
            .append(&conversation_id, &request.role, &request.content, user_ts)
            .await?;

        let completion = self.completions.complete(&model, &history).await?;

        // Local clock, never before the user turn, keeps listing order stable.
        let reply_ts = Utc::now().timestamp().max(user_ts);
        self.messages
            .append(&conversation_id, &completion.role, &completion.content, reply_ts)
            .await?;

        let conversation_name = if history.len() == AUTO_NAME_HISTORY_LEN {
            history.push(ChatTurn::new(
                completion.role.as_str(),
                completion.content.as_str(),
            ));
            self.auto_name(&conversation_id, &model, &history).await?
        } else {
            None
        };

        info!(
            "Completed turn for conversation {} ({} messages)",
            conversation_id,
            history.len()
        );

        Ok(SendChatOutcome {
            conversation_id,
            role: completion.role,
            content: completion.content,
            created: completion.created,
            conversation_name,
        })
    }

    /// Name the conversation from its history.
    ///
    /// A failed title request is logged and leaves the name unchanged.
    async fn auto_name(
        &self,
        conversation_id: &str,
        model: &str,
        history: &[ChatTurn],
    ) -> ChatResult<Option<String>> {
        let title = match self.completions.summarize_title(model, history).await {
            Ok(title) => title,
            Err(e) => {
                warn!("Could not name conversation {}: {}", conversation_id, e);
                return Ok(None);
            }
        };
        if title.is_empty() {
            debug!("Model returned an empty title for {}", conversation_id);
            return Ok(None);
        }

        self.conversations.set_name(conversation_id, &title).await?;
        debug!("Named conversation {}: {}", conversation_id, title);
        Ok(Some(title))
    }
}
