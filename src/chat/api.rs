//! Outbound chat API interface.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of one outbound send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The recipient chat has permanently blocked the bot. Triggers a
    /// rate-limit backoff on the aliases that resolved to that chat.
    #[error("recipient blocked the bot")]
    Blocked,

    /// Any other (transient) API failure.
    #[error("send failed: {0}")]
    Api(String),
}

/// Outbound messaging API.
///
/// All operations target one chat and report success, a permanent block,
/// or a transient failure. Only the serialization authority ever calls
/// these methods.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a text message.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError>;

    /// Send a photo.
    async fn send_photo(&self, chat_id: i64, name: &str, content: &[u8]) -> Result<(), SendError>;

    /// Send a video.
    async fn send_video(&self, chat_id: i64, name: &str, content: &[u8]) -> Result<(), SendError>;

    /// Send an audio file.
    async fn send_audio(&self, chat_id: i64, name: &str, content: &[u8]) -> Result<(), SendError>;

    /// Send a generic document.
    async fn send_document(&self, chat_id: i64, name: &str, content: &[u8])
        -> Result<(), SendError>;
}
