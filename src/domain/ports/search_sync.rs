use crate::domain::{errors::SyncError, ContentSummary, Scene};
use async_trait::async_trait;

/// Write side of the search backend. Every operation is idempotent and keyed
/// by a stable identifier, so the live watcher and a concurrent full-sync
/// converge instead of corrupting each other.
#[async_trait]
pub trait SearchSyncClient: Send + Sync {
    /// Upserts a batch of scenes and returns how many were actually written.
    /// A failure inside the batch must not abort the rest of it.
    async fn upsert_scenes(&self, scenes: &[Scene]) -> Result<usize, SyncError>;

    /// Deletes scenes by id. Missing ids are a no-op, not an error.
    async fn delete_scenes(&self, scene_ids: &[String]) -> Result<usize, SyncError>;

    async fn upsert_content(&self, content: &ContentSummary) -> Result<(), SyncError>;

    async fn delete_content(&self, content_id: &str) -> Result<(), SyncError>;
}
