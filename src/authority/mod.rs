//! Serialization authority for postgate.
//!
//! A single task owns the address directory, the delivery log and the
//! outbound chat API client. Concurrent mail sessions never touch that
//! state directly; they send `Resolve` and `Deliver` requests over a
//! bounded queue and suspend on a private reply channel. The loop
//! answers requests strictly one at a time in arrival order, which is
//! the only synchronization the shared state needs.

mod orchestrator;
mod rate_limit;

pub use orchestrator::{chunk_text, DeliveryOrchestrator};
pub use rate_limit::{Gate, RateLimiter};

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chat::ChatApi;
use crate::config::LimitsConfig;
use crate::db::{AddressRepository, Database};
use crate::mail::ParsedMessage;
use crate::{PostgateError, Result};

/// Capacity of the request queue shared by all mail sessions.
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Outcome of resolving an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Alias is live; deliveries go to this chat.
    Accepted { chat_id: i64 },
    /// Alias is muted or unknown.
    Muted,
    /// Alias exists but its rate-limit clock is in the future.
    RateLimited,
}

/// A request from a mail session, carrying its private reply slot.
enum Request {
    Resolve {
        alias: String,
        reply: oneshot::Sender<Result<Resolution>>,
    },
    Deliver {
        message: ParsedMessage,
        destinations: BTreeMap<i64, Vec<String>>,
        reply: oneshot::Sender<Result<bool>>,
    },
}

/// Cloneable handle mail sessions use to talk to the authority.
///
/// Both calls are single round-trips: send the request, suspend until
/// the reply arrives. The authority stops once every handle is dropped.
#[derive(Clone)]
pub struct AuthorityHandle {
    tx: mpsc::Sender<Request>,
}

impl AuthorityHandle {
    /// Resolve an alias to its destination chat.
    pub async fn resolve(&self, alias: &str) -> Result<Resolution> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Resolve {
                alias: alias.to_string(),
                reply,
            })
            .await
            .map_err(|_| PostgateError::AuthorityClosed)?;
        rx.await.map_err(|_| PostgateError::AuthorityClosed)?
    }

    /// Deliver a message to the resolved destination chats.
    ///
    /// `destinations` maps each chat to the aliases that resolved to it;
    /// the aliases are needed for blocked-chat throttling. Returns true
    /// only on full success across all chats.
    pub async fn deliver(
        &self,
        message: ParsedMessage,
        destinations: BTreeMap<i64, Vec<String>>,
    ) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Deliver {
                message,
                destinations,
                reply,
            })
            .await
            .map_err(|_| PostgateError::AuthorityClosed)?;
        rx.await.map_err(|_| PostgateError::AuthorityClosed)?
    }
}

/// Sole owner of all mutable delivery state.
pub struct Authority {
    db: Database,
    api: Box<dyn ChatApi>,
    limiter: RateLimiter,
    max_chunk_chars: usize,
}

impl Authority {
    /// Create an authority owning the given database and chat API.
    pub fn new(db: Database, api: Box<dyn ChatApi>, limits: &LimitsConfig) -> Self {
        Self {
            db,
            api,
            limiter: RateLimiter::new(limits),
            max_chunk_chars: limits.max_chunk_chars,
        }
    }

    /// Spawn the authority loop.
    pub fn start(self) -> (AuthorityHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (AuthorityHandle { tx }, task)
    }

    /// Serve requests in arrival order until all handles are dropped.
    async fn run(self, mut rx: mpsc::Receiver<Request>) {
        info!("authority started");
        while let Some(request) = rx.recv().await {
            match request {
                Request::Resolve { alias, reply } => {
                    let result = self.resolve(&alias).await;
                    // A session abandoned mid-call just loses its reply.
                    let _ = reply.send(result);
                }
                Request::Deliver {
                    message,
                    destinations,
                    reply,
                } => {
                    let result = self.deliver(&message, &destinations).await;
                    let _ = reply.send(result);
                }
            }
        }
        info!("authority stopped");
    }

    async fn resolve(&self, alias: &str) -> Result<Resolution> {
        let now = Utc::now().timestamp();
        let repo = AddressRepository::new(self.db.pool());

        let Some(address) = repo.get(alias).await? else {
            debug!(alias, "unknown alias");
            return Ok(Resolution::Muted);
        };
        if address.muted {
            debug!(alias, "muted alias");
            return Ok(Resolution::Muted);
        }

        match self.limiter.check(address.next_delivery, now) {
            Gate::Limited => {
                debug!(alias, next_delivery = address.next_delivery, "rate limited");
                Ok(Resolution::RateLimited)
            }
            Gate::Allowed { next_delivery } => {
                repo.set_next_delivery(alias, next_delivery).await?;
                Ok(Resolution::Accepted {
                    chat_id: address.chat_id,
                })
            }
        }
    }

    async fn deliver(
        &self,
        message: &ParsedMessage,
        destinations: &BTreeMap<i64, Vec<String>>,
    ) -> Result<bool> {
        let orchestrator = DeliveryOrchestrator::new(
            self.db.pool(),
            self.api.as_ref(),
            &self.limiter,
            self.max_chunk_chars,
        );
        orchestrator
            .deliver(message, destinations, Utc::now().timestamp())
            .await
    }
}
