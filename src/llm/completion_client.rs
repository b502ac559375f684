//! Client for an OpenAI-compatible chat-completion endpoint.
//!
//! Behaviour:
//! - One POST per call with `{model, messages}` and a bearer credential from config.
//! - The first choice of the response is the reply.
//! - No retry and no request timeout; only connecting is bounded.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::core::config::CompletionConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::types::{ChatTurn, ROLE_USER};

/// Connection establishment timeout for the pooled client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Instruction appended to the history when asking for a title.
pub const TITLE_INSTRUCTION: &str = "Summarize the conversation above in 4-5 words to use as its title. \
Reply with the title only, without quotes or punctuation at the end.";

/// Maximum title length in characters.
const MAX_TITLE_CHARS: usize = 60;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    created: i64,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// A parsed completion reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Completion {
    /// Role reported by the model (normally `assistant`).
    pub role: String,
    /// Reply text.
    pub content: String,
    /// Upstream creation time in seconds since Unix epoch.
    pub created: i64,
}

/// Chat-completion HTTP client.
#[derive(Clone, Debug)]
pub struct CompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl CompletionClient {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> ChatResult<Self> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self::with_http_client(http, config))
    }

    /// Build a client on top of an existing pool.
    #[must_use]
    pub fn with_http_client(http: Client, config: &CompletionConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Send the message history and return the first choice.
    ///
    /// # Errors
    /// Returns an upstream error on transport failure, non-2xx status,
    /// undecodable body or empty `choices`.
    pub async fn complete(&self, model: &str, messages: &[ChatTurn]) -> ChatResult<Completion> {
        let request = CompletionRequest { model, messages };

        debug!("Requesting completion from {} with {} messages", model, messages.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Completion endpoint returned {}: {}", status, truncate(&body, 200));
            return Err(ChatError::Upstream(format!(
                "completion endpoint returned status {}",
                status.as_u16()
            )));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Upstream("completion response has no choices".to_string()))?;

        Ok(Completion {
            role: choice.message.role,
            content: choice.message.content.unwrap_or_default(),
            created: parsed.created,
        })
    }

    /// Ask the model for a short title describing the exchange.
    ///
    /// Returns the cleaned title, which may be empty if the model produced nothing usable.
    ///
    /// # Errors
    /// Returns an error if the completion call fails.
    pub async fn summarize_title(&self, model: &str, history: &[ChatTurn]) -> ChatResult<String> {
        let mut messages = history.to_vec();
        messages.push(ChatTurn::new(ROLE_USER, TITLE_INSTRUCTION));

        let completion = self.complete(model, &messages).await?;
        Ok(clean_title(&completion.content))
    }
}

/// Strip decoration models like to add around titles.
fn clean_title(raw: &str) -> String {
    let line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let title = line.trim().trim_start_matches("Title:").trim_matches(|c: char| {
        c.is_whitespace() || c == '"' || c == '*' || c == '\'' || c == '.'
    });
    truncate(title, MAX_TITLE_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
