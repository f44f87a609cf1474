use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or backend unreachable; retried with backoff.
    #[error("Transient connection error: {0}")]
    TransientConnection(String),

    /// The persisted resume position was rejected by the feed.
    #[error("Invalid resume cursor: {0}")]
    InvalidCursor(String),

    /// A document could not be transformed into search records.
    #[error("Transform error: {0}")]
    Transform(String),

    /// An upsert/delete against the search backend failed, possibly partially.
    #[error("Backend write error: {0}")]
    BackendWrite(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientConnection(msg.into())
    }

    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendWrite(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
