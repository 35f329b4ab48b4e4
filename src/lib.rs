//! postgate - mail-to-chat delivery bridge.
//!
//! Accepts inbound email over SMTP, resolves each recipient alias to a
//! destination chat, applies per-alias rate limiting and mute/dedup
//! policy, and forwards the message body and attachments to that chat
//! through an outbound bot API.

pub mod authority;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod server;

pub use authority::{Authority, AuthorityHandle, Gate, RateLimiter, Resolution};
pub use chat::{ChatApi, SendError, TelegramApi};
pub use config::Config;
pub use db::{Address, AddressRepository, Database, DeliveryLogRepository};
pub use error::{PostgateError, Result};
pub use mail::{Envelope, MediaKind, MediaPart, ParsedMessage, Rejection};
pub use server::SmtpServer;
