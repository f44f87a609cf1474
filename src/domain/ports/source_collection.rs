use crate::domain::{errors::SyncError, SourceDocument};
use async_trait::async_trait;

/// Read access to the authoritative document collection.
#[async_trait]
pub trait SourceCollection: Send + Sync {
    /// Fetches the current state of a document by primary key. Used as a
    /// fallback when a change event arrives without its full document.
    async fn find_by_key(&self, key: &str) -> Result<Option<SourceDocument>, SyncError>;

    /// Every completed document, for the full-sync reconciliation pass.
    async fn completed_documents(&self) -> Result<Vec<SourceDocument>, SyncError>;

    /// Connectivity check; failing at startup is fatal.
    async fn ping(&self) -> Result<(), SyncError>;
}
