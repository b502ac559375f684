//! SQLite-backed conversation store.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{OptionalExtension, TransactionBehavior};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::types::{Conversation, DEFAULT_CONVERSATION_NAME};
use crate::chat::storage::database::StoreFuture;

/// Highest all-digit id that fits in an `i64`, or 0 when the table holds none.
///
/// Larger ids would saturate the integer cast, so they never take part in allocation.
const MAX_NUMERIC_ID_SQL: &str = "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0)
     FROM conversations
     WHERE id <> '' AND id NOT GLOB '*[^0-9]*'
       AND (length(id) < 19 OR (length(id) = 19 AND id <= '9223372036854775807'))";

const SELECT_COLUMNS: &str = "id, model, conversation_name, user_id, created_at";

/// Conversation store trait.
pub trait ConversationStore: Send + Sync {
    /// Create the conversation if no row has this id; returns the id either way.
    ///
    /// # Errors
    /// Returns an error if the existence check or the insert fails.
    fn ensure_conversation(
        &self,
        id: &str,
        model: &str,
        owner_id: &str,
    ) -> StoreFuture<'_, ChatResult<String>>;

    /// Highest numeric conversation id currently stored, or 0.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn most_recent_conversation_id(&self) -> StoreFuture<'_, ChatResult<i64>>;

    /// Allocate `most_recent + 1` and insert it in the same transaction.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn create_next(&self, model: &str, owner_id: &str) -> StoreFuture<'_, ChatResult<Conversation>>;

    /// Fetch one conversation.
    ///
    /// # Errors
    /// Returns `NotFound` if no row matches, or a storage error.
    fn get_by_id(&self, id: &str) -> StoreFuture<'_, ChatResult<Conversation>>;

    /// List an owner's conversations, newest first. Empty when none.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list_by_owner(&self, owner_id: &str) -> StoreFuture<'_, ChatResult<Vec<Conversation>>>;

    /// Rename a conversation the caller owns.
    ///
    /// # Errors
    /// Returns `Validation` for blank input, `NotFound` if the id/owner pair does not match.
    fn rename(
        &self,
        id: &str,
        owner_id: &str,
        new_name: &str,
    ) -> StoreFuture<'_, ChatResult<Conversation>>;

    /// Overwrite the name regardless of owner.
    ///
    /// # Errors
    /// Returns `NotFound` if the id does not exist.
    fn set_name(&self, id: &str, name: &str) -> StoreFuture<'_, ChatResult<()>>;

    /// Delete one conversation and its messages atomically.
    ///
    /// # Errors
    /// Returns `NotFound` if nothing matched, or a storage error.
    fn delete_by_id(&self, id: &str) -> StoreFuture<'_, ChatResult<()>>;

    /// Delete every conversation of an owner and their messages atomically.
    ///
    /// # Errors
    /// Returns `NotFound` if the owner has no conversations, or a storage error.
    fn delete_all_by_owner(&self, owner_id: &str) -> StoreFuture<'_, ChatResult<u64>>;
}

/// `SQLite` implementation of the conversation store.
#[derive(Clone)]
pub struct SqliteConversationStore {
    conn: Arc<Connection>,
}

impl SqliteConversationStore {
    /// Wrap a shared connection whose schema is already initialized.
    #[must_use]
    pub const fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }
}

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        model: row.get(1)?,
        name: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl ConversationStore for SqliteConversationStore {
    fn ensure_conversation(
        &self,
        id: &str,
        model: &str,
        owner_id: &str,
    ) -> StoreFuture<'_, ChatResult<String>> {
        let id = id.to_string();
        let model = model.to_string();
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            let now = Utc::now().timestamp();
            let (id, created) = self
                .conn
                .call(move |conn| {
                    let exists: bool = conn.query_row(
                        "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                        rusqlite::params![id],
                        |row| row.get(0),
                    )?;
                    if exists {
                        return Ok((id, false));
                    }

                    // A concurrent insert of the same id is not an error.
                    let inserted = conn.execute(
                        "INSERT INTO conversations (id, model, user_id, conversation_name, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT(id) DO NOTHING",
                        rusqlite::params![id, model, owner_id, DEFAULT_CONVERSATION_NAME, now],
                    )?;
                    Ok((id, inserted > 0))
                })
                .await?;

            if created {
                debug!("Created conversation {}", id);
            }
            Ok(id)
        })
    }

    fn most_recent_conversation_id(&self) -> StoreFuture<'_, ChatResult<i64>> {
        Box::pin(async move {
            let id = self
                .conn
                .call(|conn| Ok(conn.query_row(MAX_NUMERIC_ID_SQL, [], |row| row.get(0))?))
                .await?;
            Ok(id)
        })
    }

    fn create_next(&self, model: &str, owner_id: &str) -> StoreFuture<'_, ChatResult<Conversation>> {
        let model = model.to_string();
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            let now = Utc::now().timestamp();
            let conversation = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                    let last: i64 = tx.query_row(MAX_NUMERIC_ID_SQL, [], |row| row.get(0))?;
                    let id = last
                        .checked_add(1)
                        .ok_or_else(|| {
                            tokio_rusqlite::Error::Other("conversation id space exhausted".into())
                        })?
                        .to_string();
                    tx.execute(
                        "INSERT INTO conversations (id, model, user_id, conversation_name, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![id, model, owner_id, DEFAULT_CONVERSATION_NAME, now],
                    )?;
                    tx.commit()?;
                    Ok(Conversation {
                        id,
                        model,
                        name: DEFAULT_CONVERSATION_NAME.to_string(),
                        owner_id,
                        created_at: now,
                    })
                })
                .await?;

            debug!("Allocated conversation {}", conversation.id);
            Ok(conversation)
        })
    }

    fn get_by_id(&self, id: &str) -> StoreFuture<'_, ChatResult<Conversation>> {
        let id = id.to_string();
        Box::pin(async move {
            let key = id.clone();
            let row = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            &format!("SELECT {SELECT_COLUMNS} FROM conversations WHERE id = ?1"),
                            rusqlite::params![key],
                            conversation_from_row,
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;
            row.ok_or_else(|| ChatError::NotFound(format!("conversation {id}")))
        })
    }

    fn list_by_owner(&self, owner_id: &str) -> StoreFuture<'_, ChatResult<Vec<Conversation>>> {
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SELECT_COLUMNS}
                         FROM conversations
                         WHERE user_id = ?1
                         ORDER BY created_at DESC, rowid DESC"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![owner_id], conversation_from_row)?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }

    fn rename(
        &self,
        id: &str,
        owner_id: &str,
        new_name: &str,
    ) -> StoreFuture<'_, ChatResult<Conversation>> {
        let id = id.to_string();
        let owner_id = owner_id.to_string();
        let new_name = new_name.trim().to_string();
        Box::pin(async move {
            if id.is_empty() || new_name.is_empty() {
                return Err(ChatError::Validation(
                    "new_name and conversation_id are required".to_string(),
                ));
            }

            let key = id.clone();
            let row = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            &format!(
                                "UPDATE conversations
                                 SET conversation_name = ?1
                                 WHERE id = ?2 AND user_id = ?3
                                 RETURNING {SELECT_COLUMNS}"
                            ),
                            rusqlite::params![new_name, key, owner_id],
                            conversation_from_row,
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;
            row.ok_or_else(|| {
                ChatError::NotFound(format!("conversation {id} not found or not owned by caller"))
            })
        })
    }

    fn set_name(&self, id: &str, name: &str) -> StoreFuture<'_, ChatResult<()>> {
        let id = id.to_string();
        let name = name.to_string();
        Box::pin(async move {
            let key = id.clone();
            let updated = self
                .conn
                .call(move |conn| {
                    Ok(conn.execute(
                        "UPDATE conversations SET conversation_name = ?1 WHERE id = ?2",
                        rusqlite::params![name, key],
                    )?)
                })
                .await?;
            if updated == 0 {
                return Err(ChatError::NotFound(format!("conversation {id}")));
            }
            Ok(())
        })
    }

    fn delete_by_id(&self, id: &str) -> StoreFuture<'_, ChatResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let key = id.clone();
            let deleted = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "DELETE FROM messages WHERE conversation_id = ?1",
                        rusqlite::params![key],
                    )?;
                    let deleted = tx.execute(
                        "DELETE FROM conversations WHERE id = ?1",
                        rusqlite::params![key],
                    )?;
                    // Dropping the transaction without commit rolls it back.
                    if deleted > 0 {
                        tx.commit()?;
                    }
                    Ok(deleted)
                })
                .await?;

            if deleted == 0 {
                return Err(ChatError::NotFound(format!("conversation with id {id}")));
            }
            debug!("Deleted conversation {}", id);
            Ok(())
        })
    }

    fn delete_all_by_owner(&self, owner_id: &str) -> StoreFuture<'_, ChatResult<u64>> {
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            let key = owner_id.clone();
            let deleted = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "DELETE FROM messages
                         WHERE conversation_id IN (
                             SELECT id FROM conversations WHERE user_id = ?1
                         )",
                        rusqlite::params![key],
                    )?;
                    let deleted = tx.execute(
                        "DELETE FROM conversations WHERE user_id = ?1",
                        rusqlite::params![key],
                    )?;
                    if deleted > 0 {
                        tx.commit()?;
                    }
                    Ok(deleted)
                })
                .await?;

            if deleted == 0 {
                return Err(ChatError::NotFound(format!(
                    "no conversations found for user_id {owner_id}"
                )));
            }
            debug!("Deleted {} conversations for {}", deleted, owner_id);
            Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
        })
    }
}
