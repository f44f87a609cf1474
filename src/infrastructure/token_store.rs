use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::{errors::SyncError, ResumeToken};

/// Durable single-slot storage for the feed cursor. Writes go to a temp
/// sibling first and are renamed into place, so a crash mid-write never
/// leaves a corrupt file visible to the next read.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, token: &ResumeToken) -> Result<(), SyncError> {
        let json = serde_json::to_vec(token).map_err(|e| SyncError::internal(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json).map_err(|e| SyncError::internal(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| SyncError::internal(e.to_string()))?;
        Ok(())
    }

    /// A missing, unreadable, or unparsable token file means "no saved
    /// position" — the watcher then starts from latest.
    pub fn load(&self) -> Option<ResumeToken> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read resume token file, starting from latest");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt resume token file, starting from latest");
                None
            }
        }
    }

    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("resume token cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove resume token file"),
        }
    }
}
