//! Configuration for the chat service.
//!
//! Values come from the process environment (optionally seeded from a
//! `.env` file) and are validated once at startup. The resulting
//! [`AppConfig`] is handed to the orchestrator and the HTTP layer.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Default completion endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://chatapi.akash.network/api/v1/chat/completions";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "Meta-Llama-3-1-8B-Instruct-FP8";

/// Top-level configuration for the service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Completion API settings.
    pub completion: CompletionConfig,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed or validation fails.
    pub fn from_env() -> ChatResult<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset or blank keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed or validation fails.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(name) = get("SERVICE_NAME") {
            config.server.service_name = name;
        }
        if let Some(env) = get("ENV") {
            config.server.env = env;
        }
        if let Some(port) = get("PORT") {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|_| ChatError::InvalidConfig(format!("PORT is not a port: {port}")))?;
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.server.allowed_origins = split_origins(&origins);
        }
        if let Some(secs) = get("SHUTDOWN_TIMEOUT_SECS") {
            config.server.shutdown_timeout_secs = secs.trim().parse().map_err(|_| {
                ChatError::InvalidConfig(format!("SHUTDOWN_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(endpoint) = get("COMPLETION_URL") {
            config.completion.endpoint = endpoint;
        }
        if let Some(key) = get("AKASH_API_KEY") {
            config.completion.api_key = key;
        }
        if let Some(model) = get("DEFAULT_MODEL") {
            config.completion.default_model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.server.port == 0 {
            return Err(ChatError::InvalidConfig("server.port must be > 0".to_string()));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ChatError::InvalidConfig(
                "server.shutdown_timeout_secs must be > 0".to_string(),
            ));
        }

        Url::parse(&self.completion.endpoint)?;

        if self.completion.api_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "completion.api_key must be set (AKASH_API_KEY)".to_string(),
            ));
        }

        if self.completion.default_model.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "completion.default_model must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Service name used in logs.
    pub service_name: String,
    /// Deployment environment label.
    pub env: String,
    /// Listening port.
    pub port: u16,
    /// Allowed CORS origins; empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Maximum time to drain in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Drain timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: "bloom-be".to_string(),
            env: "local".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
            shutdown_timeout_secs: 10,
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("bloom.sqlite"),
        }
    }
}

/// Completion API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Full URL of the chat-completion endpoint.
    pub endpoint: String,
    /// Bearer credential sent upstream.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Model used when a request names none.
    pub default_model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_URL.to_string(),
            api_key: String::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Split a `;`-separated origin list, dropping blanks.
fn split_origins(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_api_key() {
        let config = AppConfig::from_lookup(lookup_from(&[("AKASH_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.env, "local");
        assert_eq!(config.completion.default_model, DEFAULT_MODEL);
        assert_eq!(config.completion.endpoint, DEFAULT_COMPLETION_URL);
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ChatError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides_and_origins() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("AKASH_API_KEY", "sk-test"),
            ("PORT", "9090"),
            ("ALLOWED_ORIGINS", "http://a.test; ;http://b.test;"),
            ("DATABASE_PATH", "/tmp/chat.sqlite"),
            ("DEFAULT_MODEL", "tiny"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/chat.sqlite"));
        assert_eq!(config.completion.default_model, "tiny");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(
            AppConfig::from_lookup(lookup_from(&[("AKASH_API_KEY", "k"), ("PORT", "http")]))
                .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("AKASH_API_KEY", "k"),
                ("COMPLETION_URL", "not a url")
            ]))
            .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("AKASH_API_KEY", "k"),
                ("SHUTDOWN_TIMEOUT_SECS", "0")
            ]))
            .is_err()
        );
    }
}
