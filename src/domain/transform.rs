//! Pure mapping from source documents to derived search records. No I/O:
//! the eligibility gate and every fallback re-evaluate from the document
//! alone on each call.

use crate::domain::entities::{
    ContentSummary, Scene, SceneEntry, SourceDocument, TimeValue, VideoContext,
};
use crate::domain::errors::{Result, SyncError};

/// Parses a colon-delimited clock string ("H:MM:SS[.fff]") into seconds.
/// The last segment is a float, every preceding segment an integer, folded
/// as `h * 3600 + m * 60 + s`. Malformed input is an error, never zero.
pub fn parse_clock_time(raw: &str) -> Result<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (seconds_part, whole_parts) = parts
        .split_last()
        .ok_or_else(|| SyncError::transform(format!("empty time string {raw:?}")))?;

    let seconds: f64 = seconds_part
        .trim()
        .parse()
        .map_err(|_| SyncError::transform(format!("malformed time string {raw:?}")))?;

    let mut total = seconds;
    let mut scale = 60.0;
    for part in whole_parts.iter().rev() {
        let unit: i64 = part
            .trim()
            .parse()
            .map_err(|_| SyncError::transform(format!("malformed time string {raw:?}")))?;
        total += unit as f64 * scale;
        scale *= 60.0;
    }
    Ok(total)
}

fn seconds_from(value: &TimeValue) -> Result<f64> {
    match value {
        TimeValue::Seconds(s) => Ok(*s),
        TimeValue::Clock(raw) => parse_clock_time(raw),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Video-level duration in seconds: the numeric field when present, else a
/// best-effort parse of the human-readable duration. Parse failures yield
/// `None`, never an error.
fn video_duration(doc: &SourceDocument) -> Option<f64> {
    doc.video_duration_sec.or_else(|| {
        let raw = doc.enriched_data.video_info.duration.trim();
        if raw.contains(':') {
            parse_clock_time(raw).ok()
        } else {
            None
        }
    })
}

fn video_description(doc: &SourceDocument) -> String {
    let audio = &doc.enriched_data.audio;
    non_empty(&audio.metadata.transcription)
        .or_else(|| non_empty(&audio.transcription))
        .unwrap_or_default()
}

fn video_context(doc: &SourceDocument) -> VideoContext {
    VideoContext {
        video_id: doc.content_id(),
        video_title: doc.title.clone(),
        video_description: video_description(doc),
        video_tags: doc.video_tags.clone(),
        video_duration_sec: video_duration(doc),
        video_created_at: doc.video_created_at.clone(),
    }
}

fn scene_category(entry: &SceneEntry) -> String {
    if !entry.category.is_empty() {
        entry.category.clone()
    } else {
        entry.video_type.clone()
    }
}

/// Derives one `Scene` per entry in the scene list.
///
/// Returns an empty list when the document is not completed or carries no
/// scenes — the sole eligibility gate, re-checked on every event. A scene
/// without a `scene_id` or with a malformed time string fails the whole
/// document: a partial scene set would diverge from the source.
pub fn derive_scenes(doc: &SourceDocument) -> Result<Vec<Scene>> {
    if !doc.is_completed() {
        return Ok(Vec::new());
    }
    let scene_list = &doc.enriched_data.scene_list;
    if scene_list.is_empty() {
        return Ok(Vec::new());
    }

    let summaries = &doc.enriched_data.audio.scene_summaries;
    let video = video_context(doc);

    let mut scenes = Vec::with_capacity(scene_list.len());
    for (idx, entry) in scene_list.iter().enumerate() {
        let scene_id = entry
            .scene_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::transform(format!("scene at index {idx} has no scene_id")))?;

        // Fuse the visual caption with the audio summary for this cluster
        // index; caption alone when no summary exists.
        let caption = entry.scene_captioning.trim();
        let description = match summaries
            .get(&idx.to_string())
            .map(String::as_str)
            .and_then(non_empty)
        {
            Some(audio) => format!("{caption}\n{audio}").trim().to_string(),
            None => caption.to_string(),
        };

        let start_time_sec = entry
            .start
            .as_ref()
            .map(seconds_from)
            .transpose()
            .map_err(|e| SyncError::transform(format!("scene {scene_id} start: {e}")))?
            .unwrap_or(0.0);
        let end_time_sec = entry
            .end
            .as_ref()
            .map(seconds_from)
            .transpose()
            .map_err(|e| SyncError::transform(format!("scene {scene_id} end: {e}")))?
            .unwrap_or(0.0);

        scenes.push(Scene {
            scene_id,
            scene_description: description,
            start_time_sec,
            end_time_sec,
            video: video.clone(),
            category: scene_category(entry),
            created_date: entry.created_date.clone(),
            author: entry.author.clone(),
        });
    }

    Ok(scenes)
}

/// Derives the whole-video summary record, or `None` when the document is
/// not eligible. `category`/`author` are copied from the first scene in the
/// list — inherited behavior, not a statement about data quality.
pub fn derive_content(doc: &SourceDocument) -> Option<ContentSummary> {
    if !doc.is_completed() {
        return None;
    }
    let enriched = &doc.enriched_data;
    let first = enriched.scene_list.first()?;

    let content_id = doc.content_id();
    if content_id.is_empty() {
        return None;
    }

    let description = non_empty(&enriched.audio.summary)
        .or_else(|| non_empty(&enriched.audio.transcription))
        .unwrap_or_default();

    Some(ContentSummary {
        content_id,
        title: doc.title.clone(),
        description,
        tags: doc.video_tags.clone(),
        duration_sec: video_duration(doc).unwrap_or(0.0),
        created_at: doc.video_created_at.clone().unwrap_or_default(),
        category: scene_category(first),
        author: first.author.clone(),
    })
}

/// Every `scene_id` present in the document, regardless of eligibility.
/// Used to clean up derived records on delete.
pub fn scene_ids(doc: &SourceDocument) -> Vec<String> {
    doc.enriched_data
        .scene_list
        .iter()
        .filter_map(|entry| entry.scene_id.clone())
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: serde_json::Value) -> SourceDocument {
        serde_json::from_value(value).unwrap()
    }

    fn completed_two_scene_doc() -> SourceDocument {
        doc(serde_json::json!({
            "unique_id": "vid-1",
            "status": "completed",
            "title": "Morning News",
            "video_tags": ["news"],
            "enriched_data": {
                "scene_list": [
                    {
                        "scene_id": "a",
                        "scene_captioning": "Anchor at desk",
                        "start": 0.0,
                        "end": "00:00:10",
                        "category": "studio",
                        "author": "desk-cam"
                    },
                    {
                        "scene_id": "b",
                        "scene_captioning": "Weather map",
                        "start": "00:00:10",
                        "end": 25.5
                    }
                ],
                "audio": {
                    "scene_summaries": { "0": "Headlines are read." },
                    "summary": "A short news bulletin.",
                    "transcription": "Good morning ..."
                }
            }
        }))
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("00:02:05.500").unwrap(), 125.5);
        assert_eq!(parse_clock_time("01:00:00").unwrap(), 3600.0);
        assert_eq!(parse_clock_time("02:30").unwrap(), 150.0);
    }

    #[test]
    fn test_parse_clock_time_rejects_garbage() {
        assert!(matches!(
            parse_clock_time("00:02:xx"),
            Err(SyncError::Transform(_))
        ));
        assert!(matches!(
            parse_clock_time("abc"),
            Err(SyncError::Transform(_))
        ));
    }

    #[test]
    fn test_derive_scenes_two_entries() {
        let scenes = derive_scenes(&completed_two_scene_doc()).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].scene_id, "a");
        assert_eq!(scenes[1].scene_id, "b");
        assert_eq!(scenes[0].start_time_sec, 0.0);
        assert_eq!(scenes[0].end_time_sec, 10.0);
        assert_eq!(scenes[1].start_time_sec, 10.0);
        assert_eq!(scenes[1].end_time_sec, 25.5);
    }

    #[test]
    fn test_description_fuses_caption_and_audio_summary() {
        let scenes = derive_scenes(&completed_two_scene_doc()).unwrap();
        assert_eq!(scenes[0].scene_description, "Anchor at desk\nHeadlines are read.");
        // No summary for index 1: caption alone.
        assert_eq!(scenes[1].scene_description, "Weather map");
    }

    #[test]
    fn test_non_completed_documents_are_ineligible() {
        for status in ["pending", "processing", "failed", ""] {
            let mut d = completed_two_scene_doc();
            d.status = status.to_string();
            assert!(derive_scenes(&d).unwrap().is_empty());
            assert!(derive_content(&d).is_none());
        }
    }

    #[test]
    fn test_empty_scene_list_is_ineligible() {
        let mut d = completed_two_scene_doc();
        d.enriched_data.scene_list.clear();
        assert!(derive_scenes(&d).unwrap().is_empty());
        assert!(derive_content(&d).is_none());
    }

    #[test]
    fn test_missing_scene_id_fails_the_document() {
        let mut d = completed_two_scene_doc();
        d.enriched_data.scene_list[1].scene_id = None;
        assert!(matches!(derive_scenes(&d), Err(SyncError::Transform(_))));
    }

    #[test]
    fn test_malformed_scene_time_fails_the_document() {
        let mut d = completed_two_scene_doc();
        d.enriched_data.scene_list[0].start = Some(TimeValue::Clock("0:xx:00".into()));
        assert!(matches!(derive_scenes(&d), Err(SyncError::Transform(_))));
    }

    #[test]
    fn test_duration_falls_back_to_video_info() {
        let mut d = completed_two_scene_doc();
        d.video_duration_sec = None;
        d.enriched_data.video_info.duration = "00:05:00".to_string();
        let scenes = derive_scenes(&d).unwrap();
        assert_eq!(scenes[0].video.video_duration_sec, Some(300.0));

        // Malformed duration strings degrade to absent, never an error.
        d.enriched_data.video_info.duration = "five:minutes".to_string();
        let scenes = derive_scenes(&d).unwrap();
        assert_eq!(scenes[0].video.video_duration_sec, None);
    }

    #[test]
    fn test_derive_content_takes_category_author_from_first_scene() {
        let content = derive_content(&completed_two_scene_doc()).unwrap();
        assert_eq!(content.content_id, "vid-1");
        assert_eq!(content.title, "Morning News");
        assert_eq!(content.description, "A short news bulletin.");
        assert_eq!(content.category, "studio");
        assert_eq!(content.author, "desk-cam");
    }

    #[test]
    fn test_content_description_falls_back_to_transcription() {
        let mut d = completed_two_scene_doc();
        d.enriched_data.audio.summary = String::new();
        let content = derive_content(&d).unwrap();
        assert_eq!(content.description, "Good morning ...");
    }

    #[test]
    fn test_category_falls_back_to_video_type() {
        let mut d = completed_two_scene_doc();
        d.enriched_data.scene_list[0].category = String::new();
        d.enriched_data.scene_list[0].video_type = "broadcast".to_string();
        let scenes = derive_scenes(&d).unwrap();
        assert_eq!(scenes[0].category, "broadcast");
    }

    #[test]
    fn test_scene_ids_ignores_eligibility() {
        let mut d = completed_two_scene_doc();
        d.status = "failed".to_string();
        assert_eq!(scene_ids(&d), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_content_id_falls_back_to_primary_key() {
        let mut d = completed_two_scene_doc();
        d.unique_id = String::new();
        d.id = Some("6553abc".to_string());
        let content = derive_content(&d).unwrap();
        assert_eq!(content.content_id, "6553abc");
    }
}
