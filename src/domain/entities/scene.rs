use serde::{Deserialize, Serialize};

/// A search-indexable sub-segment of a video. `scene_id` is globally stable
/// and serves as the upsert/delete key, which makes re-applying the same
/// event a no-op in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: String,
    pub scene_description: String,
    pub start_time_sec: f64,
    pub end_time_sec: f64,
    pub video: VideoContext,
    pub category: String,
    pub created_date: String,
    pub author: String,
}

impl Scene {
    /// Text used for the dense-search embedding of this scene.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.scene_description, self.video.video_title)
            .trim()
            .to_string()
    }
}

/// Video-level fields denormalized into every scene record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContext {
    pub video_id: String,
    pub video_title: String,
    pub video_description: String,
    pub video_tags: Vec<String>,
    pub video_duration_sec: Option<f64>,
    pub video_created_at: Option<String>,
}

/// One whole-video record per sync-eligible document, keyed by `content_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub content_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub duration_sec: f64,
    pub created_at: String,
    pub category: String,
    pub author: String,
}

impl ContentSummary {
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.description)
            .trim()
            .to_string()
    }
}
