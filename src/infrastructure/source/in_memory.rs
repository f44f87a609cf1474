use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::ports::{ChangeStream, ChangeStreamConsumer, SourceCollection};
use crate::domain::{ChangeEvent, ResumeToken, SourceDocument, SyncError};

/// Scripted change feed for tests. Events are an append-only log; tokens are
/// the log offsets. Unlike a real feed, opening without a token replays the
/// whole backlog, which is what test scenarios want.
pub struct InMemoryChangeFeed {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
    notify: Arc<Notify>,
    fail_opens: Mutex<u32>,
}

impl InMemoryChangeFeed {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            fail_opens: Mutex::new(0),
        }
    }

    pub fn push(&self, event: ChangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        self.notify.notify_waiters();
    }

    /// Makes the next `n` open attempts fail with a transient error, for
    /// reconnect scenarios.
    pub fn fail_next_opens(&self, n: u32) {
        if let Ok(mut failures) = self.fail_opens.lock() {
            *failures = n;
        }
    }
}

impl Default for InMemoryChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeStreamConsumer for InMemoryChangeFeed {
    async fn open(
        &self,
        resume_from: Option<ResumeToken>,
    ) -> Result<Box<dyn ChangeStream>, SyncError> {
        {
            let mut failures = self
                .fail_opens
                .lock()
                .map_err(|e| SyncError::internal(e.to_string()))?;
            if *failures > 0 {
                *failures -= 1;
                return Err(SyncError::transient("scripted connection failure"));
            }
        }

        let position = match resume_from {
            Some(token) => {
                let offset = token
                    .0
                    .as_u64()
                    .ok_or_else(|| SyncError::invalid_cursor("resume token is not an offset"))?;
                offset as usize + 1
            }
            None => 0,
        };

        Ok(Box::new(InMemoryChangeStream {
            events: self.events.clone(),
            notify: self.notify.clone(),
            position,
        }))
    }
}

struct InMemoryChangeStream {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
    notify: Arc<Notify>,
    position: usize,
}

#[async_trait]
impl ChangeStream for InMemoryChangeStream {
    async fn next(&mut self) -> Result<Option<(ChangeEvent, ResumeToken)>, SyncError> {
        loop {
            // Register for the wakeup before checking the log, so a push
            // between the check and the await is not missed.
            let notified = self.notify.notified();
            {
                let events = self
                    .events
                    .lock()
                    .map_err(|e| SyncError::internal(e.to_string()))?;
                if self.position < events.len() {
                    let event = events[self.position].clone();
                    let token = ResumeToken::new(serde_json::json!(self.position));
                    self.position += 1;
                    return Ok(Some((event, token)));
                }
            }
            notified.await;
        }
    }
}

/// In-memory document collection for tests.
pub struct InMemorySource {
    docs: RwLock<HashMap<String, SourceDocument>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<String>, doc: SourceDocument) {
        if let Ok(mut docs) = self.docs.write() {
            docs.insert(key.into(), doc);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut docs) = self.docs.write() {
            docs.remove(key);
        }
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceCollection for InMemorySource {
    async fn find_by_key(&self, key: &str) -> Result<Option<SourceDocument>, SyncError> {
        let docs = self
            .docs
            .read()
            .map_err(|e| SyncError::internal(e.to_string()))?;
        Ok(docs.get(key).cloned())
    }

    async fn completed_documents(&self) -> Result<Vec<SourceDocument>, SyncError> {
        let docs = self
            .docs
            .read()
            .map_err(|e| SyncError::internal(e.to_string()))?;
        Ok(docs.values().filter(|d| d.is_completed()).cloned().collect())
    }

    async fn ping(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
