use std::collections::VecDeque;
use std::str::FromStr;

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool, Runtime};
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::warn;

use crate::domain::ports::{ChangeStream, ChangeStreamConsumer, SourceCollection};
use crate::domain::{ChangeEvent, OperationType, ResumeToken, SourceDocument, SyncError};

const READ_BLOCK_MS: usize = 5_000;
const READ_COUNT: usize = 16;

pub fn create_pool(redis_url: &str) -> Result<Pool, SyncError> {
    let cfg = RedisPoolConfig::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| SyncError::transient(e.to_string()))
}

async fn conn(pool: &Pool) -> Result<Connection, SyncError> {
    pool.get()
        .await
        .map_err(|e| SyncError::transient(e.to_string()))
}

/// Source-collection mirror held in a Redis hash: one JSON document per
/// field, keyed by the document's primary key.
pub struct RedisSourceStore {
    pool: Pool,
    mirror_key: String,
}

impl RedisSourceStore {
    pub fn new(pool: Pool, mirror_key: impl Into<String>) -> Self {
        Self {
            pool,
            mirror_key: mirror_key.into(),
        }
    }
}

#[async_trait]
impl SourceCollection for RedisSourceStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<SourceDocument>, SyncError> {
        let mut conn = conn(&self.pool).await?;
        let raw: Option<String> = conn
            .hget(&self.mirror_key, key)
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| SyncError::transform(format!("document {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn completed_documents(&self) -> Result<Vec<SourceDocument>, SyncError> {
        let mut conn = conn(&self.pool).await?;
        let raw: Vec<String> = conn
            .hvals(&self.mirror_key)
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;

        let mut docs = Vec::new();
        for json in raw {
            match serde_json::from_str::<SourceDocument>(&json) {
                Ok(doc) if doc.is_completed() => docs.push(doc),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unparsable source document"),
            }
        }
        Ok(docs)
    }

    async fn ping(&self) -> Result<(), SyncError> {
        let mut conn = conn(&self.pool).await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;
        Ok(())
    }
}

/// Change feed over a Redis Stream. Each entry carries `operation`, `key`
/// and, when available, `document` / `pre_image` JSON fields; the entry id
/// doubles as the resume token.
pub struct RedisChangeFeed {
    pool: Pool,
    stream_key: String,
}

impl RedisChangeFeed {
    pub fn new(pool: Pool, stream_key: impl Into<String>) -> Self {
        Self {
            pool,
            stream_key: stream_key.into(),
        }
    }
}

fn is_stream_id(id: &str) -> bool {
    match id.split_once('-') {
        Some((ms, seq)) => {
            !ms.is_empty()
                && !seq.is_empty()
                && ms.bytes().all(|b| b.is_ascii_digit())
                && seq.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[async_trait]
impl ChangeStreamConsumer for RedisChangeFeed {
    async fn open(
        &self,
        resume_from: Option<ResumeToken>,
    ) -> Result<Box<dyn ChangeStream>, SyncError> {
        let position = match resume_from {
            Some(token) => {
                let id = token
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| SyncError::invalid_cursor("resume token is not a stream id"))?;
                if !is_stream_id(&id) {
                    return Err(SyncError::invalid_cursor(format!(
                        "malformed stream id {id:?}"
                    )));
                }
                id
            }
            // "$" skips history: without a saved position the watcher only
            // sees mutations from now on.
            None => "$".to_string(),
        };

        // Probe the broker so a dead connection surfaces here, where the
        // supervisor applies backoff, instead of on the first read.
        let mut probe = conn(&self.pool).await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut probe)
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;

        Ok(Box::new(RedisChangeStream {
            pool: self.pool.clone(),
            stream_key: self.stream_key.clone(),
            position,
            buffered: VecDeque::new(),
        }))
    }
}

struct RedisChangeStream {
    pool: Pool,
    stream_key: String,
    position: String,
    buffered: VecDeque<(ChangeEvent, ResumeToken)>,
}

fn parse_entry(entry: &StreamId) -> Result<ChangeEvent, SyncError> {
    let op_raw: String = entry
        .get("operation")
        .ok_or_else(|| SyncError::transform("feed entry missing operation"))?;
    let operation = OperationType::from_str(&op_raw)
        .map_err(|_| SyncError::transform(format!("unknown operation {op_raw:?}")))?;

    let document_key: String = entry
        .get("key")
        .ok_or_else(|| SyncError::transform("feed entry missing document key"))?;

    let full_document = entry
        .get::<String>("document")
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| SyncError::transform(format!("feed entry document: {e}")))?;

    let pre_image = entry
        .get::<String>("pre_image")
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| SyncError::transform(format!("feed entry pre_image: {e}")))?;

    Ok(ChangeEvent {
        operation,
        document_key,
        full_document,
        pre_image,
    })
}

fn map_read_error(e: redis::RedisError) -> SyncError {
    let msg = e.to_string();
    if msg.contains("Invalid stream ID") {
        SyncError::invalid_cursor(msg)
    } else {
        SyncError::transient(msg)
    }
}

#[async_trait]
impl ChangeStream for RedisChangeStream {
    async fn next(&mut self) -> Result<Option<(ChangeEvent, ResumeToken)>, SyncError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }

            let mut conn = conn(&self.pool).await?;
            let options = StreamReadOptions::default()
                .block(READ_BLOCK_MS)
                .count(READ_COUNT);
            let reply: StreamReadReply = conn
                .xread_options(&[&self.stream_key], &[&self.position], &options)
                .await
                .map_err(map_read_error)?;

            for key in reply.keys {
                for entry in key.ids {
                    self.position = entry.id.clone();
                    match parse_entry(&entry) {
                        Ok(event) => self
                            .buffered
                            .push_back((event, ResumeToken::from_id(&entry.id))),
                        Err(e) => {
                            warn!(id = %entry.id, error = %e, "skipping malformed feed entry")
                        }
                    }
                }
            }
            // An empty reply is just the blocking read timing out.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stream_id() {
        assert!(is_stream_id("1700000000000-0"));
        assert!(is_stream_id("0-1"));
        assert!(!is_stream_id("latest"));
        assert!(!is_stream_id("170000-"));
        assert!(!is_stream_id("a-b"));
    }
}
