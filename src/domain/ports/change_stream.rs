use crate::domain::{errors::SyncError, ChangeEvent, ResumeToken};
use async_trait::async_trait;

/// An open subscription on the source collection's mutation feed: an
/// ordered, blocking pull of events, each paired with the cursor snapshot
/// to persist once the event is handled.
#[async_trait]
pub trait ChangeStream: Send {
    /// Waits for the next event. `None` means the feed was closed by the
    /// remote end; the supervisor reconnects.
    async fn next(&mut self) -> Result<Option<(ChangeEvent, ResumeToken)>, SyncError>;
}

#[async_trait]
pub trait ChangeStreamConsumer: Send + Sync {
    /// Opens the feed, optionally resuming after a persisted position.
    /// A rejected position must surface as `SyncError::InvalidCursor` so the
    /// caller can drop the token and restart from latest instead of
    /// retrying forever.
    async fn open(
        &self,
        resume_from: Option<ResumeToken>,
    ) -> Result<Box<dyn ChangeStream>, SyncError>;
}
