use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{ports::SearchSyncClient, ContentSummary, Scene, SyncError};

/// Key-value rendition of the search backend. Doubles as the "memory"
/// backend selection and as the substitute in tests: the supervisor cannot
/// tell it apart from the real thing.
pub struct InMemorySearchClient {
    scenes: RwLock<HashMap<String, Scene>>,
    contents: RwLock<HashMap<String, ContentSummary>>,
}

impl InMemorySearchClient {
    pub fn new() -> Self {
        Self {
            scenes: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
        }
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn content_count(&self) -> usize {
        self.contents.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn scene(&self, scene_id: &str) -> Option<Scene> {
        self.scenes.read().ok()?.get(scene_id).cloned()
    }

    pub fn content(&self, content_id: &str) -> Option<ContentSummary> {
        self.contents.read().ok()?.get(content_id).cloned()
    }

    /// All scene ids, sorted for stable assertions.
    pub fn scene_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .scenes
            .read()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl Default for InMemorySearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchSyncClient for InMemorySearchClient {
    async fn upsert_scenes(&self, scenes: &[Scene]) -> Result<usize, SyncError> {
        let mut store = self
            .scenes
            .write()
            .map_err(|e| SyncError::internal(e.to_string()))?;

        for scene in scenes {
            store.insert(scene.scene_id.clone(), scene.clone());
        }
        Ok(scenes.len())
    }

    async fn delete_scenes(&self, scene_ids: &[String]) -> Result<usize, SyncError> {
        let mut store = self
            .scenes
            .write()
            .map_err(|e| SyncError::internal(e.to_string()))?;

        let mut deleted = 0;
        for id in scene_ids {
            if store.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn upsert_content(&self, content: &ContentSummary) -> Result<(), SyncError> {
        self.contents
            .write()
            .map_err(|e| SyncError::internal(e.to_string()))?
            .insert(content.content_id.clone(), content.clone());
        Ok(())
    }

    async fn delete_content(&self, content_id: &str) -> Result<(), SyncError> {
        self.contents
            .write()
            .map_err(|e| SyncError::internal(e.to_string()))?
            .remove(content_id);
        Ok(())
    }
}
