//! Append-only message log scoped to a conversation.

use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::types::Message;
use crate::chat::storage::database::StoreFuture;

/// Message store trait.
pub trait MessageStore: Send + Sync {
    /// Append one message and return the stored row.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including an unknown conversation).
    fn append(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        timestamp: i64,
    ) -> StoreFuture<'_, ChatResult<Message>>;

    /// All messages of a conversation in ascending timestamp order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> StoreFuture<'_, ChatResult<Vec<Message>>>;
}

/// `SQLite` implementation of the message store.
#[derive(Clone)]
pub struct SqliteMessageStore {
    conn: Arc<Connection>,
}

impl SqliteMessageStore {
    /// Wrap a shared connection whose schema is already initialized.
    #[must_use]
    pub const fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }
}

impl MessageStore for SqliteMessageStore {
    fn append(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        timestamp: i64,
    ) -> StoreFuture<'_, ChatResult<Message>> {
        let conversation_id = conversation_id.to_string();
        let role = role.to_string();
        let content = content.to_string();
        Box::pin(async move {
            let message = self
                .conn
                .call(move |conn| {
                    let id: i64 = conn.query_row(
                        "INSERT INTO messages (conversation_id, role, content, timestamp)
                         VALUES (?1, ?2, ?3, ?4)
                         RETURNING id",
                        rusqlite::params![conversation_id, role, content, timestamp],
                        |row| row.get(0),
                    )?;
                    Ok(Message {
                        id,
                        conversation_id,
                        role,
                        content,
                        timestamp,
                    })
                })
                .await?;
            Ok(message)
        })
    }

    fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> StoreFuture<'_, ChatResult<Vec<Message>>> {
        let conversation_id = conversation_id.to_string();
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, role, content, timestamp
                         FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY timestamp ASC, id ASC",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![conversation_id], |row| {
                            Ok(Message {
                                id: row.get(0)?,
                                conversation_id: row.get(1)?,
                                role: row.get(2)?,
                                content: row.get(3)?,
                                timestamp: row.get(4)?,
                            })
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }
}
