//! Mapping of chat errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::chat::core::errors::{ChatError, ErrorKind};

use super::locale::Locale;

/// A failed request: the internal error plus the caller's language.
#[derive(Debug)]
pub struct ApiError {
    error: ChatError,
    locale: Locale,
}

impl ApiError {
    /// Wrap an error for the given locale.
    #[must_use]
    pub const fn new(error: ChatError, locale: Locale) -> Self {
        Self { error, locale }
    }

    /// Adapter for `map_err`.
    #[must_use]
    pub fn localized(locale: Locale) -> impl Fn(ChatError) -> Self {
        move |error| Self::new(error, locale)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    trace_id: String,
}

/// HTTP status for an error category.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let status = status_for(kind);
        let trace_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(trace_id = %trace_id, status = status.as_u16(), "{}", self.error);
        } else {
            tracing::warn!(trace_id = %trace_id, status = status.as_u16(), "{}", self.error);
        }

        let body = ErrorBody {
            success: false,
            error: self.locale.message(kind),
            trace_id,
        };
        (status, Json(body)).into_response()
    }
}
