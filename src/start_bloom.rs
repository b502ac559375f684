//! Startup helpers for the Bloom chat server.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::chat::core::config::AppConfig;
use crate::chat::core::errors::ChatResult;
use crate::chat::storage::open_database;
use crate::server::{self, AppState};

/// Run the server (used by the `bloom-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Bloom chat v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        "Service {} ({}), completion endpoint: {}",
        config.server.service_name,
        config.server.env,
        config.completion.endpoint
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

/// Open storage, build the state and serve until a shutdown signal.
///
/// # Errors
/// Returns an error if the database cannot be opened or the server fails.
pub async fn serve(config: AppConfig) -> ChatResult<()> {
    let conn = open_database(&config.storage).await?;
    tracing::info!("Database ready at {}", config.storage.sqlite_path.display());

    let drain_timeout = config.server.shutdown_timeout();
    let state = AppState::new(config, conn)?;
    run_until(state, shutdown_signal(), drain_timeout).await
}

/// Serve until `signal` completes, then drain for at most `drain_timeout`.
///
/// # Errors
/// Returns an error if the server fails before or during draining.
pub async fn run_until<F>(state: Arc<AppState>, signal: F, drain_timeout: Duration) -> ChatResult<()>
where
    F: Future<Output = ()> + Send,
{
    let stop = Arc::new(Notify::new());
    let stop_server = Arc::clone(&stop);
    let server = server::run_server_with_shutdown(state, async move {
        stop_server.notified().await;
    });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        () = signal => {}
    }

    tracing::info!("Shutdown signal received, draining for up to {:?}", drain_timeout);
    stop.notify_one();
    if let Ok(result) = tokio::time::timeout(drain_timeout, server).await {
        result
    } else {
        tracing::warn!("Drain timeout elapsed, closing remaining connections");
        Ok(())
    }
}

/// Complete on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
