//! Outbound chat messaging for postgate.
//!
//! The delivery engine only knows the [`ChatApi`] trait; the concrete
//! Telegram Bot API client lives in [`telegram`].

mod api;
mod telegram;

pub use api::{ChatApi, SendError};
pub use telegram::TelegramApi;
