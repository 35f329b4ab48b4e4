//! Address directory repository.
//!
//! Maps mailbox aliases to owning chats, mute flags and the per-alias
//! rate-limit clock. Aliases are unique across the directory.

use super::DbPool;
use crate::{PostgateError, Result};

/// One mailbox alias owned by a chat.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Address {
    /// The mailbox alias (local part of the email address).
    pub alias: String,
    /// Identifier of the chat owning this alias.
    pub chat_id: i64,
    /// Whether deliveries to this alias are muted.
    pub muted: bool,
    /// Earliest unix timestamp at which the next delivery is permitted.
    pub next_delivery: i64,
}

/// Repository for address directory operations.
pub struct AddressRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new AddressRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new alias for a chat.
    pub async fn create(&self, alias: &str, chat_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO addresses (alias, chat_id) VALUES ($1, $2)")
            .bind(alias)
            .bind(chat_id)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(())
    }

    /// Look up an alias.
    pub async fn get(&self, alias: &str) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            "SELECT alias, chat_id, muted, next_delivery FROM addresses WHERE alias = $1",
        )
        .bind(alias)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(address)
    }

    /// List all aliases owned by a chat, ordered by alias.
    pub async fn list_for_chat(&self, chat_id: i64) -> Result<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(
            "SELECT alias, chat_id, muted, next_delivery FROM addresses
             WHERE chat_id = $1 ORDER BY alias",
        )
        .bind(chat_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(addresses)
    }

    /// Set or clear the mute flag on an alias.
    ///
    /// Returns false if the alias does not exist.
    pub async fn set_muted(&self, alias: &str, muted: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE addresses SET muted = $1 WHERE alias = $2")
            .bind(muted as i32)
            .bind(alias)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the rate-limit clock of an alias.
    pub async fn set_next_delivery(&self, alias: &str, next_delivery: i64) -> Result<()> {
        sqlx::query("UPDATE addresses SET next_delivery = $1 WHERE alias = $2")
            .bind(next_delivery)
            .bind(alias)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(())
    }

    /// Raise the rate-limit clock of an alias to at least `floor`.
    ///
    /// The clock only ever moves forward here; a later value is kept.
    pub async fn raise_next_delivery(&self, alias: &str, floor: i64) -> Result<()> {
        sqlx::query("UPDATE addresses SET next_delivery = MAX(next_delivery, $1) WHERE alias = $2")
            .bind(floor)
            .bind(alias)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove an alias from the directory.
    pub async fn remove(&self, alias: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE alias = $1")
            .bind(alias)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
