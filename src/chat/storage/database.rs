//! `SQLite` connection setup and schema.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_rusqlite::Connection;
use tracing::info;

use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::ChatResult;
use crate::chat::core::types::DEFAULT_CONVERSATION_NAME;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Open the database file from config and create the schema.
///
/// # Errors
/// Returns an error if the database cannot be opened or the schema cannot be created.
pub async fn open_database(config: &StorageConfig) -> ChatResult<Arc<Connection>> {
    let conn = Connection::open(&config.sqlite_path).await?;
    init_schema(&conn).await?;
    info!("Opened database at {}", config.sqlite_path.display());
    Ok(Arc::new(conn))
}

/// Open a private in-memory database with the schema applied.
///
/// # Errors
/// Returns an error if the schema cannot be created.
pub async fn open_in_memory() -> ChatResult<Arc<Connection>> {
    let conn = Connection::open_in_memory().await?;
    init_schema(&conn).await?;
    Ok(Arc::new(conn))
}

/// Enable foreign keys and create tables and indexes if missing.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn init_schema(conn: &Connection) -> ChatResult<()> {
    conn.call(|conn| {
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                user_id TEXT NOT NULL,
                conversation_name TEXT NOT NULL DEFAULT '{DEFAULT_CONVERSATION_NAME}',
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_user
                ON conversations (user_id);
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL
                    REFERENCES conversations (id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
                ON messages (conversation_id, timestamp);"
        ))?;
        Ok(())
    })
    .await?;
    Ok(())
}
