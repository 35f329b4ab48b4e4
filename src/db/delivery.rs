//! Delivery log repository.
//!
//! Durable ledger of (chat, message-id) pairs that were already
//! forwarded. Used for deduplication so a protocol-level retry never
//! re-delivers to a chat that already got the message. Insert-only.

use super::DbPool;
use crate::{PostgateError, Result};

/// Repository for delivery log operations.
pub struct DeliveryLogRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> DeliveryLogRepository<'a> {
    /// Create a new DeliveryLogRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Check whether a message was already delivered to a chat.
    pub async fn exists(&self, chat_id: i64, message_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM delivery_log WHERE chat_id = $1 AND message_id = $2)",
        )
        .bind(chat_id)
        .bind(message_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Record a completed delivery.
    ///
    /// Recording the same pair twice is harmless.
    pub async fn record(&self, chat_id: i64, message_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO delivery_log (chat_id, message_id) VALUES ($1, $2)")
            .bind(chat_id)
            .bind(message_id)
            .execute(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count recorded deliveries for a chat.
    pub async fn count_for_chat(&self, chat_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delivery_log WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| PostgateError::Database(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_record_and_exists() {
        let db = setup_db().await;
        let repo = DeliveryLogRepository::new(db.pool());

        assert!(!repo.exists(42, "m1").await.unwrap());
        repo.record(42, "m1").await.unwrap();
        assert!(repo.exists(42, "m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_pairs_are_independent() {
        let db = setup_db().await;
        let repo = DeliveryLogRepository::new(db.pool());

        repo.record(42, "m1").await.unwrap();

        assert!(!repo.exists(42, "m2").await.unwrap());
        assert!(!repo.exists(43, "m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_twice_keeps_one_row() {
        let db = setup_db().await;
        let repo = DeliveryLogRepository::new(db.pool());

        repo.record(42, "m1").await.unwrap();
        repo.record(42, "m1").await.unwrap();

        assert_eq!(repo.count_for_chat(42).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_for_chat() {
        let db = setup_db().await;
        let repo = DeliveryLogRepository::new(db.pool());

        repo.record(42, "m1").await.unwrap();
        repo.record(42, "m2").await.unwrap();
        repo.record(7, "m1").await.unwrap();

        assert_eq!(repo.count_for_chat(42).await.unwrap(), 2);
        assert_eq!(repo.count_for_chat(7).await.unwrap(), 1);
        assert_eq!(repo.count_for_chat(99).await.unwrap(), 0);
    }
}
