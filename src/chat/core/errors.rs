//! Error types for the chat subsystem.

use thiserror::Error;

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed or missing request fields.
    #[error("validation error: {0}")]
    Validation(String),
    /// No matching conversation or message.
    #[error("not found: {0}")]
    NotFound(String),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Completion API answered with an unusable status or body.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Completion API transport failure.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error category used at the HTTP boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Caller sent something unusable.
    Validation,
    /// Target row does not exist.
    NotFound,
    /// Database failure.
    Storage,
    /// Completion API failure.
    Upstream,
    /// Anything else (configuration, I/O).
    Internal,
}

impl ChatError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) | Self::Sqlite(_) => ErrorKind::Storage,
            Self::Upstream(_) | Self::HttpClient(_) | Self::Serialization(_) => {
                ErrorKind::Upstream
            }
            Self::InvalidConfig(_) | Self::Url(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_storage_errors() {
        let err = ChatError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(
            ChatError::from(tokio_rusqlite::Error::ConnectionClosed).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_kind_for_request_errors() {
        assert_eq!(
            ChatError::Validation("content is required".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ChatError::NotFound("conversation 7".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ChatError::Upstream("empty choices".to_string()).kind(),
            ErrorKind::Upstream
        );
        assert_eq!(
            ChatError::InvalidConfig("port".to_string()).kind(),
            ErrorKind::Internal
        );
    }
}
