//! Shared support for integration tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use postgate::config::LimitsConfig;
use postgate::{Authority, AuthorityHandle, ChatApi, Database, SendError};

/// Chat API double that records every send as a trace line.
///
/// Chats can be marked blocked (permanent block error) or failing
/// (transient error); everything else succeeds.
#[derive(Clone, Default)]
pub struct RecordingApi {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    sent: Mutex<Vec<String>>,
    blocked: Mutex<HashSet<i64>>,
    failing: Mutex<HashSet<i64>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sends so far, as `kind:chat_id:payload` trace lines.
    pub fn sent(&self) -> Vec<String> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub fn block_chat(&self, chat_id: i64) {
        self.inner.blocked.lock().unwrap().insert(chat_id);
    }

    pub fn fail_chat(&self, chat_id: i64) {
        self.inner.failing.lock().unwrap().insert(chat_id);
    }

    pub fn heal_chat(&self, chat_id: i64) {
        self.inner.blocked.lock().unwrap().remove(&chat_id);
        self.inner.failing.lock().unwrap().remove(&chat_id);
    }

    fn record(&self, chat_id: i64, entry: String) -> Result<(), SendError> {
        if self.inner.blocked.lock().unwrap().contains(&chat_id) {
            return Err(SendError::Blocked);
        }
        if self.inner.failing.lock().unwrap().contains(&chat_id) {
            return Err(SendError::Api("transient failure".to_string()));
        }
        self.inner.sent.lock().unwrap().push(entry);
        Ok(())
    }
}

#[async_trait]
impl ChatApi for RecordingApi {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        self.record(chat_id, format!("text:{chat_id}:{text}"))
    }

    async fn send_photo(&self, chat_id: i64, name: &str, _content: &[u8]) -> Result<(), SendError> {
        self.record(chat_id, format!("photo:{chat_id}:{name}"))
    }

    async fn send_video(&self, chat_id: i64, name: &str, _content: &[u8]) -> Result<(), SendError> {
        self.record(chat_id, format!("video:{chat_id}:{name}"))
    }

    async fn send_audio(&self, chat_id: i64, name: &str, _content: &[u8]) -> Result<(), SendError> {
        self.record(chat_id, format!("audio:{chat_id}:{name}"))
    }

    async fn send_document(
        &self,
        chat_id: i64,
        name: &str,
        _content: &[u8],
    ) -> Result<(), SendError> {
        self.record(chat_id, format!("document:{chat_id}:{name}"))
    }
}

/// A running delivery engine over a temporary on-disk database.
///
/// `db` is a second connection to the same file, for assertions and
/// fixture setup; the authority owns its own connection.
pub struct Engine {
    pub handle: AuthorityHandle,
    pub api: RecordingApi,
    pub db: Database,
    _tmp: tempfile::TempDir,
}

/// Start an engine with the given limits.
pub async fn start_engine(limits: LimitsConfig) -> Engine {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("postgate.db");

    let authority_db = Database::open(&path).await.unwrap();
    let db = Database::open(&path).await.unwrap();

    let api = RecordingApi::new();
    let (handle, _task) = Authority::new(authority_db, Box::new(api.clone()), &limits).start();

    Engine {
        handle,
        api,
        db,
        _tmp: tmp,
    }
}

/// Build a minimal raw email with the given Message-ID and body.
pub fn raw_email(message_id: &str, body: &str) -> Vec<u8> {
    format!(
        "Message-ID: <{message_id}>\r\n\
         Subject: Test\r\n\
         From: sender@remote.org\r\n\
         To: abc@example.org\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         {body}\r\n"
    )
    .into_bytes()
}
