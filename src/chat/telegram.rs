//! Telegram Bot API client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::api::{ChatApi, SendError};
use crate::config::ChatConfig;
use crate::{PostgateError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Error code the Bot API returns when a chat has blocked the bot.
const BLOCKED_ERROR_CODE: i64 = 403;

/// Telegram Bot API client.
pub struct TelegramApi {
    client: Client,
    api_url: String,
    token: String,
}

/// Envelope of every Bot API reply.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramApi {
    /// Create a new client from the chat configuration.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PostgateError::Chat(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    /// Call one Bot API method with a multipart form.
    async fn call(&self, method: &str, form: Form) -> std::result::Result<(), SendError> {
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        let reply: ApiReply = response
            .json()
            .await
            .map_err(|e| SendError::Api(format!("malformed API reply: {e}")))?;

        if reply.ok {
            return Ok(());
        }
        if reply.error_code == Some(BLOCKED_ERROR_CODE) {
            return Err(SendError::Blocked);
        }
        Err(SendError::Api(
            reply
                .description
                .unwrap_or_else(|| "unknown API error".to_string()),
        ))
    }

    /// Build a form carrying a chat id and one uploaded file.
    fn file_form(chat_id: i64, field: &str, name: &str, content: &[u8]) -> Form {
        let part = Part::bytes(content.to_vec()).file_name(name.to_string());
        Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part)
    }
}

#[async_trait::async_trait]
impl ChatApi for TelegramApi {
    async fn send_text(&self, chat_id: i64, text: &str) -> std::result::Result<(), SendError> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("text", text.to_string());
        self.call("sendMessage", form).await
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        name: &str,
        content: &[u8],
    ) -> std::result::Result<(), SendError> {
        self.call("sendPhoto", Self::file_form(chat_id, "photo", name, content))
            .await
    }

    async fn send_video(
        &self,
        chat_id: i64,
        name: &str,
        content: &[u8],
    ) -> std::result::Result<(), SendError> {
        self.call("sendVideo", Self::file_form(chat_id, "video", name, content))
            .await
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        name: &str,
        content: &[u8],
    ) -> std::result::Result<(), SendError> {
        self.call("sendAudio", Self::file_form(chat_id, "audio", name, content))
            .await
    }

    async fn send_document(
        &self,
        chat_id: i64,
        name: &str,
        content: &[u8],
    ) -> std::result::Result<(), SendError> {
        self.call(
            "sendDocument",
            Self::file_form(chat_id, "document", name, content),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = ChatConfig {
            bot_token: "12345:abcde".to_string(),
            api_url: "https://api.telegram.org/".to_string(),
            timeout_secs: 5,
        };
        let api = TelegramApi::new(&config).unwrap();
        assert_eq!(api.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_api_reply_parses_error() {
        let reply: ApiReply =
            serde_json::from_str(r#"{"ok":false,"error_code":403,"description":"Forbidden"}"#)
                .unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.error_code, Some(403));
        assert_eq!(reply.description.as_deref(), Some("Forbidden"));
    }

    #[test]
    fn test_api_reply_parses_success() {
        let reply: ApiReply =
            serde_json::from_str(r#"{"ok":true,"result":{"message_id":1}}"#).unwrap();
        assert!(reply.ok);
        assert!(reply.error_code.is_none());
    }
}
