//! HTTP server for the Bloom chat API.
//!
//! Provides REST endpoints for:
//! - Sending chat turns through the completion API
//! - Listing, reading, renaming and deleting conversations
//! - Reading a conversation's messages

pub mod error;
pub mod identity;
pub mod locale;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use locale::Locale;
pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::core::config::ServerConfig;
use crate::chat::core::errors::ChatResult;

/// CORS policy from configured origins; any origin when none are listed.
#[must_use]
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers(Any)
}

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server_with_shutdown<F>(state: Arc<AppState>, shutdown_signal: F) -> ChatResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors = cors_layer(&state.config.server);
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    let service_name = state.config.server.service_name.clone();

    let app: Router = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("{} listening on http://{}", service_name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}
