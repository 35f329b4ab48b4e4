//! Delivery orchestration.
//!
//! Given a validated message and the resolved destination chats, sends
//! text chunks, inline media and attachments through the chat API,
//! deduplicates against the delivery log, and throttles aliases whose
//! chat has blocked the bot. Runs only inside the authority task, one
//! delivery at a time.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use crate::chat::{ChatApi, SendError};
use crate::db::{AddressRepository, DbPool, DeliveryLogRepository};
use crate::mail::{MediaKind, ParsedMessage};
use crate::Result;

/// One delivery pass over a set of destination chats.
pub struct DeliveryOrchestrator<'a> {
    pool: &'a DbPool,
    api: &'a dyn ChatApi,
    limiter: &'a RateLimiter,
    max_chunk_chars: usize,
}

impl<'a> DeliveryOrchestrator<'a> {
    pub fn new(
        pool: &'a DbPool,
        api: &'a dyn ChatApi,
        limiter: &'a RateLimiter,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            pool,
            api,
            limiter,
            max_chunk_chars,
        }
    }

    /// Deliver a message to every destination chat.
    ///
    /// Returns true only if every chat either received the message now
    /// or already had it (dedup). Per-chat failures are logged and
    /// folded into the aggregate; they never abort the other chats.
    pub async fn deliver(
        &self,
        message: &ParsedMessage,
        destinations: &BTreeMap<i64, Vec<String>>,
        now: i64,
    ) -> Result<bool> {
        let log = DeliveryLogRepository::new(self.pool);
        let mut all_delivered = true;

        for (&chat_id, aliases) in destinations {
            if log.exists(chat_id, &message.message_id).await? {
                debug!(
                    chat_id,
                    message_id = %message.message_id,
                    "already delivered, skipping"
                );
                continue;
            }

            match self.send_to_chat(chat_id, message).await {
                Ok(()) => {
                    log.record(chat_id, &message.message_id).await?;
                    debug!(chat_id, message_id = %message.message_id, "delivered");
                }
                Err(SendError::Blocked) => {
                    warn!(chat_id, "chat blocked the bot, throttling its aliases");
                    self.throttle_aliases(aliases, now).await?;
                    all_delivered = false;
                }
                Err(SendError::Api(error)) => {
                    warn!(chat_id, %error, "delivery failed");
                    all_delivered = false;
                }
            }
        }

        Ok(all_delivered)
    }

    /// Send the full message content to one chat, aborting on the first
    /// failure.
    async fn send_to_chat(
        &self,
        chat_id: i64,
        message: &ParsedMessage,
    ) -> std::result::Result<(), SendError> {
        for chunk in chunk_text(&message.composed_text(), self.max_chunk_chars) {
            self.api.send_text(chat_id, &chunk).await?;
        }

        for part in &message.inlines {
            match MediaKind::from_content_type(&part.content_type) {
                MediaKind::Photo => {
                    self.api
                        .send_photo(chat_id, &part.file_name, &part.content)
                        .await?;
                }
                MediaKind::Video => {
                    self.api
                        .send_video(chat_id, &part.file_name, &part.content)
                        .await?;
                }
                MediaKind::Audio => {
                    self.api
                        .send_audio(chat_id, &part.file_name, &part.content)
                        .await?;
                }
                MediaKind::Document => {
                    self.api
                        .send_document(chat_id, &part.file_name, &part.content)
                        .await?;
                }
            }
        }

        for part in &message.attachments {
            self.api
                .send_document(chat_id, &part.file_name, &part.content)
                .await?;
        }

        Ok(())
    }

    /// Push the rate-limit clock of every alias forward to the blocked
    /// backoff floor. Clocks already further out are left alone.
    async fn throttle_aliases(&self, aliases: &[String], now: i64) -> Result<()> {
        let repo = AddressRepository::new(self.pool);
        let floor = self.limiter.backoff_floor(now);
        for alias in aliases {
            repo.raise_next_delivery(alias, floor).await?;
        }
        Ok(())
    }
}

/// Split text into ordered chunks of at most `max_chars` characters.
///
/// Prefers to break at the last newline within the window so lines are
/// not split; cuts hard at the boundary when the window contains no
/// newline. The newline chosen as a break point is consumed. Blank
/// chunks are dropped, as the chat API rejects them.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte index of the first character past the window, if any.
        let window_end = match rest.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let window = &rest[..window_end];
        match window.rfind('\n') {
            Some(newline) => {
                chunks.push(rest[..newline].to_string());
                rest = &rest[newline + 1..];
            }
            None => {
                chunks.push(window.to_string());
                rest = &rest[window_end..];
            }
        }
    }

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short_text_is_single_chunk() {
        assert_eq!(chunk_text("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_chunk_exact_length_is_single_chunk() {
        assert_eq!(chunk_text("hello", 5), vec!["hello"]);
    }

    #[test]
    fn test_chunk_never_exceeds_max() {
        let text = "abcdefghij".repeat(10);
        for chunk in chunk_text(&text, 7) {
            assert!(chunk.chars().count() <= 7);
        }
    }

    #[test]
    fn test_chunk_hard_cut_without_newline() {
        assert_eq!(chunk_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_chunk_splits_at_last_newline_in_window() {
        // Window of 10 chars covers "line1\nlin"; last newline is at 5.
        let chunks = chunk_text("line1\nline2\nline3", 10);
        assert_eq!(chunks, vec!["line1", "line2", "line3"]);
    }

    #[test]
    fn test_chunk_prefers_latest_newline() {
        let chunks = chunk_text("ab\ncd\nefgh", 9);
        assert_eq!(chunks[0], "ab\ncd");
        assert_eq!(chunks[1], "efgh");
    }

    #[test]
    fn test_chunk_drops_empty_chunks() {
        let chunks = chunk_text("\n\nabc", 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert_eq!(chunks.join(""), "abc");
    }

    #[test]
    fn test_chunk_counts_characters_not_bytes() {
        // Four 3-byte characters; max 2 chars per chunk.
        let chunks = chunk_text("ありがとう", 2);
        assert_eq!(chunks, vec!["あり", "がと", "う"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 10).is_empty());
    }
}
