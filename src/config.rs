//! Configuration module for postgate.

use serde::Deserialize;
use std::path::Path;

use crate::{PostgateError, Result};

/// SMTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind the SMTP listener to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Mail domain this bridge serves. Recipients under any other
    /// domain are rejected.
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    2525
}

fn default_domain() -> String {
    "localhost".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            domain: default_domain(),
        }
    }
}

/// Outbound chat API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Bot token for the outbound messaging API.
    #[serde(default)]
    pub bot_token: String,
    /// Base URL of the messaging API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_chat_timeout() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_api_url(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/postgate.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Delivery limits and rate-limit policy.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum length of one outbound text chunk, in characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Interval added to an alias's clock on every accepted delivery,
    /// in seconds.
    #[serde(default = "default_rate_interval")]
    pub rate_interval_secs: i64,
    /// Leaky-bucket window in seconds. Bounds how much permission an
    /// idle alias can accumulate.
    #[serde(default = "default_rate_window")]
    pub rate_window_secs: i64,
    /// Throttle applied to an alias after its chat blocks the bot,
    /// in seconds.
    #[serde(default = "default_blocked_backoff")]
    pub blocked_backoff_secs: i64,
}

fn default_max_message_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_chunk_chars() -> usize {
    4096
}

fn default_rate_interval() -> i64 {
    60
}

fn default_rate_window() -> i64 {
    3600
}

fn default_blocked_backoff() -> i64 {
    86400
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_chunk_chars: default_max_chunk_chars(),
            rate_interval_secs: default_rate_interval(),
            rate_window_secs: default_rate_window(),
            blocked_backoff_secs: default_blocked_backoff(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/postgate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// SMTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Outbound chat API settings.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Delivery limits and rate-limit policy.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PostgateError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PostgateError::Config(format!("config parse error: {e}")))
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the bot token is empty
    /// - any limit is zero or negative
    pub fn validate(&self) -> Result<()> {
        if self.chat.bot_token.is_empty() {
            return Err(PostgateError::Config(
                "bot_token is not set. Set it in config.toml under [chat].".to_string(),
            ));
        }
        if self.limits.max_message_size == 0 {
            return Err(PostgateError::Config(
                "max_message_size must be positive".to_string(),
            ));
        }
        if self.limits.max_chunk_chars == 0 {
            return Err(PostgateError::Config(
                "max_chunk_chars must be positive".to_string(),
            ));
        }
        if self.limits.rate_interval_secs <= 0 {
            return Err(PostgateError::Config(
                "rate_interval_secs must be positive".to_string(),
            ));
        }
        if self.limits.rate_window_secs <= 0 {
            return Err(PostgateError::Config(
                "rate_window_secs must be positive".to_string(),
            ));
        }
        if self.limits.blocked_backoff_secs <= 0 {
            return Err(PostgateError::Config(
                "blocked_backoff_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
