use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document in the source `video_queue` collection. Owned by an external
/// enrichment pipeline; this crate only reads it. Every field is lenient:
/// documents observed mid-pipeline can miss any part of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub video_tags: Vec<String>,
    #[serde(default)]
    pub video_duration_sec: Option<f64>,
    #[serde(default)]
    pub video_created_at: Option<String>,
    #[serde(default)]
    pub enriched_data: EnrichedData,
}

impl SourceDocument {
    pub const STATUS_COMPLETED: &'static str = "completed";

    /// Only completed documents are eligible for search sync.
    pub fn is_completed(&self) -> bool {
        self.status == Self::STATUS_COMPLETED
    }

    /// Stable identifier for the derived content record: `unique_id`,
    /// falling back to the primary key for legacy documents.
    pub fn content_id(&self) -> String {
        if !self.unique_id.is_empty() {
            self.unique_id.clone()
        } else {
            self.id.clone().unwrap_or_default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedData {
    #[serde(default)]
    pub scene_list: Vec<SceneEntry>,
    #[serde(default)]
    pub audio: AudioData,
    #[serde(default)]
    pub video_info: VideoInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioData {
    /// Per-cluster scene summaries, keyed by the scene's list index as a
    /// string ("0", "1", ...).
    #[serde(default)]
    pub scene_summaries: HashMap<String, String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub metadata: AudioMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioMetadata {
    #[serde(default)]
    pub transcription: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Human-readable duration, e.g. "01:02:03".
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneEntry {
    #[serde(default)]
    pub scene_id: Option<String>,
    #[serde(default)]
    pub scene_captioning: String,
    #[serde(default)]
    pub start: Option<TimeValue>,
    #[serde(default)]
    pub end: Option<TimeValue>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub video_type: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub author: String,
}

/// Scene timestamps arrive either as plain seconds or as a colon-delimited
/// clock string ("H:MM:SS.fff").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Clock(String),
}
