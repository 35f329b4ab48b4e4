//! Mail session state machine.
//!
//! One `Envelope` tracks a single mail transaction: bytes accumulate
//! under a size cap, recipients resolve through the authority, and
//! close hands the parsed message to the delivery orchestrator. The
//! envelope holds no reference to storage; every shared-state step is
//! a blocking round-trip to the authority.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::message::ParsedMessage;
use super::{mime, split_address};
use crate::authority::{AuthorityHandle, Resolution};

/// Rejection classes surfaced to the mail-transfer front end.
///
/// 4xx classes are transient (the sending server should retry later),
/// 5xx classes are permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Recipient is not served here, unknown, or muted. Permanent.
    BadRecipient,
    /// Message exceeds the configured size cap. Permanent.
    TooLarge,
    /// MIME parse failure or missing Message-ID. Permanent.
    MalformedContent,
    /// Recipient alias is rate limited. Transient.
    TooManyRequests,
    /// Delivery could not be completed for every chat. Transient.
    MailboxUnavailable,
}

impl Rejection {
    /// SMTP status code for this rejection.
    pub fn code(&self) -> u16 {
        match self {
            Rejection::BadRecipient => 550,
            Rejection::TooLarge => 552,
            Rejection::MalformedContent => 554,
            Rejection::TooManyRequests => 451,
            Rejection::MailboxUnavailable => 450,
        }
    }

    /// Human-readable status message.
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::BadRecipient => "bad recipient",
            Rejection::TooLarge => "message too large",
            Rejection::MalformedContent => "malformed content",
            Rejection::TooManyRequests => "too many requests",
            Rejection::MailboxUnavailable => "mailbox unavailable",
        }
    }

    /// Whether the sending server must not retry.
    pub fn is_permanent(&self) -> bool {
        self.code() >= 500
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.message())
    }
}

/// One in-flight mail transaction.
#[derive(Clone)]
pub struct Envelope {
    authority: AuthorityHandle,
    domain: String,
    sender: String,
    max_size: usize,
    data: Vec<u8>,
    oversized: bool,
    /// Destination chats with the aliases that resolved to each. A chat
    /// reached through two aliases appears once.
    destinations: BTreeMap<i64, Vec<String>>,
}

impl Envelope {
    /// Open a new transaction for the given sender.
    pub fn begin(
        authority: AuthorityHandle,
        domain: impl Into<String>,
        sender: impl Into<String>,
        max_size: usize,
    ) -> Self {
        Self {
            authority,
            domain: domain.into(),
            sender: sender.into(),
            max_size,
            data: Vec::new(),
            oversized: false,
            destinations: BTreeMap::new(),
        }
    }

    /// Append message bytes.
    ///
    /// Once the cumulative size exceeds the cap the buffer is discarded
    /// and this and every further call fails; nothing is retained for
    /// an oversized transaction.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), Rejection> {
        if self.oversized {
            return Err(Rejection::TooLarge);
        }
        if self.data.len() + chunk.len() > self.max_size {
            debug!(sender = %self.sender, max_size = self.max_size, "message too large");
            self.data = Vec::new();
            self.oversized = true;
            return Err(Rejection::TooLarge);
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Accept a recipient address, resolving it through the authority.
    ///
    /// Resolving the same alias twice is idempotent; a chat reached
    /// through two aliases is still delivered to once.
    pub async fn add_recipient(&mut self, recipient: &str) -> Result<(), Rejection> {
        let Some((alias, host)) = split_address(recipient) else {
            return Err(Rejection::BadRecipient);
        };
        if host != self.domain {
            debug!(recipient, domain = %self.domain, "recipient host not served");
            return Err(Rejection::BadRecipient);
        }

        match self.authority.resolve(&alias).await {
            Ok(Resolution::Accepted { chat_id }) => {
                let aliases = self.destinations.entry(chat_id).or_default();
                if !aliases.contains(&alias) {
                    aliases.push(alias);
                }
                Ok(())
            }
            Ok(Resolution::Muted) => Err(Rejection::BadRecipient),
            Ok(Resolution::RateLimited) => Err(Rejection::TooManyRequests),
            Err(_) => Err(Rejection::MailboxUnavailable),
        }
    }

    /// Finish the transaction: parse, validate and deliver.
    ///
    /// Full success across all destination chats is the only path to
    /// acceptance; any per-chat failure reports the transaction as
    /// transiently failed so the sender retries (dedup makes the retry
    /// safe for chats that already succeeded).
    pub async fn close(self) -> Result<(), Rejection> {
        if self.oversized {
            return Err(Rejection::TooLarge);
        }
        if self.destinations.is_empty() {
            return Err(Rejection::BadRecipient);
        }

        let email = mime::parse_email(&self.data).map_err(|e| {
            debug!(sender = %self.sender, error = %e, "MIME parse failed");
            Rejection::MalformedContent
        })?;
        let Some(message) = ParsedMessage::from_email(email) else {
            debug!(sender = %self.sender, "missing Message-ID");
            return Err(Rejection::MalformedContent);
        };

        debug!(
            sender = %self.sender,
            message_id = %message.message_id,
            chats = self.destinations.len(),
            "closing transaction"
        );

        match self.authority.deliver(message, self.destinations).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Rejection::MailboxUnavailable),
            Err(_) => Err(Rejection::MailboxUnavailable),
        }
    }

    /// Bytes accumulated so far.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of distinct destination chats resolved so far.
    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }
}
