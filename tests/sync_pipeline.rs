use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use scene_sync::application::SyncSupervisor;
use scene_sync::domain::{ChangeEvent, SourceDocument};
use scene_sync::infrastructure::{
    FileTokenStore, InMemoryChangeFeed, InMemorySearchClient, InMemorySource,
};

fn completed_doc(unique_id: &str, scene_ids: &[&str]) -> SourceDocument {
    let scenes: Vec<serde_json::Value> = scene_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            serde_json::json!({
                "scene_id": id,
                "scene_captioning": format!("scene {id}"),
                "start": i as f64 * 10.0,
                "end": (i as f64 + 1.0) * 10.0,
                "category": "news",
                "author": "studio"
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "unique_id": unique_id,
        "status": "completed",
        "title": format!("video {unique_id}"),
        "video_tags": ["tag"],
        "enriched_data": {
            "scene_list": scenes,
            "audio": { "summary": "a summary" }
        }
    }))
    .unwrap()
}

struct Harness {
    source: Arc<InMemorySource>,
    feed: Arc<InMemoryChangeFeed>,
    search: Arc<InMemorySearchClient>,
    tokens: FileTokenStore,
    supervisor: SyncSupervisor,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FileTokenStore::new(dir.path().join("resume_token.json"));
        let source = Arc::new(InMemorySource::new());
        let feed = Arc::new(InMemoryChangeFeed::new());
        let search = Arc::new(InMemorySearchClient::new());
        let supervisor = SyncSupervisor::new(
            source.clone(),
            feed.clone(),
            search.clone(),
            tokens.clone(),
        )
        .with_backoff(Duration::from_millis(5), Duration::from_millis(50));

        Self {
            source,
            feed,
            search,
            tokens,
            supervisor,
            _dir: dir,
        }
    }

    /// Runs the supervisor until `done` holds, then shuts it down.
    async fn run_until(&self, done: impl Fn() -> bool) {
        let (tx, rx) = watch::channel(false);
        let supervisor = self.supervisor.clone();
        let handle = tokio::spawn(async move { supervisor.run(rx).await });

        wait_for(done).await;

        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}

async fn wait_for(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_insert_event_upserts_scenes_and_content() {
    let h = Harness::new();
    let doc = completed_doc("vid-1", &["a", "b"]);

    h.supervisor
        .handle_event(&ChangeEvent::insert("vid-1", doc))
        .await
        .unwrap();

    assert_eq!(h.search.scene_ids(), vec!["a".to_string(), "b".to_string()]);
    let content = h.search.content("vid-1").expect("content record");
    assert_eq!(content.content_id, "vid-1");
    assert_eq!(h.search.content_count(), 1);
}

#[tokio::test]
async fn test_redelivered_event_is_idempotent() {
    let h = Harness::new();
    let event = ChangeEvent::insert("vid-1", completed_doc("vid-1", &["a", "b"]));

    // Crash-and-redeliver: the same event applied twice must converge to
    // the same backend state as applying it once.
    h.supervisor.handle_event(&event).await.unwrap();
    h.supervisor.handle_event(&event).await.unwrap();

    assert_eq!(h.search.scene_count(), 2);
    assert_eq!(h.search.content_count(), 1);

    let delete =
        ChangeEvent::delete("vid-1").with_pre_image(completed_doc("vid-1", &["a", "b"]));
    h.supervisor.handle_event(&delete).await.unwrap();
    h.supervisor.handle_event(&delete).await.unwrap();

    assert_eq!(h.search.scene_count(), 0);
    assert_eq!(h.search.content_count(), 0);
}

#[tokio::test]
async fn test_missing_full_document_falls_back_to_fetch() {
    let h = Harness::new();
    h.source.insert("vid-1", completed_doc("vid-1", &["a"]));

    h.supervisor
        .handle_event(&ChangeEvent::new(
            scene_sync::domain::OperationType::Update,
            "vid-1",
        ))
        .await
        .unwrap();

    assert_eq!(h.search.scene_ids(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_vanished_document_is_nothing_to_do() {
    let h = Harness::new();

    h.supervisor
        .handle_event(&ChangeEvent::new(
            scene_sync::domain::OperationType::Update,
            "ghost",
        ))
        .await
        .unwrap();

    assert_eq!(h.search.scene_count(), 0);
    assert_eq!(h.search.content_count(), 0);
}

#[tokio::test]
async fn test_delete_with_pre_image_removes_derived_records() {
    let h = Harness::new();
    let doc = completed_doc("vid-1", &["a", "b"]);
    h.supervisor
        .handle_event(&ChangeEvent::insert("vid-1", doc.clone()))
        .await
        .unwrap();

    h.supervisor
        .handle_event(&ChangeEvent::delete("vid-1").with_pre_image(doc))
        .await
        .unwrap();

    assert_eq!(h.search.scene_count(), 0);
    assert_eq!(h.search.content_count(), 0);
}

#[tokio::test]
async fn test_delete_without_pre_image_is_skipped_not_fatal() {
    let h = Harness::new();
    h.supervisor
        .handle_event(&ChangeEvent::insert(
            "vid-1",
            completed_doc("vid-1", &["a"]),
        ))
        .await
        .unwrap();

    // No pre-image: cleanup is impossible, the event must be skipped
    // without touching the backend and without an error.
    h.supervisor
        .handle_event(&ChangeEvent::delete("vid-1"))
        .await
        .unwrap();

    assert_eq!(h.search.scene_count(), 1);
    assert_eq!(h.search.content_count(), 1);
}

#[tokio::test]
async fn test_document_leaving_eligibility_drops_derived_records() {
    let h = Harness::new();
    let doc = completed_doc("vid-1", &["a", "b"]);
    h.supervisor
        .handle_event(&ChangeEvent::insert("vid-1", doc.clone()))
        .await
        .unwrap();

    let mut reopened = doc;
    reopened.status = "processing".to_string();
    h.supervisor
        .handle_event(&ChangeEvent::update("vid-1", reopened))
        .await
        .unwrap();

    assert_eq!(h.search.scene_count(), 0);
    assert_eq!(h.search.content_count(), 0);
}

#[tokio::test]
async fn test_cursor_durability_across_restart() {
    let h = Harness::new();
    for i in 1..=3 {
        let id = format!("vid-{i}");
        let sid = format!("s{i}");
        h.feed
            .push(ChangeEvent::insert(id.clone(), completed_doc(&id, &[sid.as_str()])));
    }

    let search = h.search.clone();
    h.run_until(move || search.content_count() == 3).await;

    // The saved cursor points at the last processed event.
    assert_eq!(
        h.tokens.load().unwrap().0,
        serde_json::json!(2),
        "cursor should sit on the third event"
    );

    // Simulated restart with a fresh backend: the replayed run must only
    // see events after the cursor.
    let fresh_search = Arc::new(InMemorySearchClient::new());
    let restarted = SyncSupervisor::new(
        h.source.clone(),
        h.feed.clone(),
        fresh_search.clone(),
        h.tokens.clone(),
    );
    h.feed
        .push(ChangeEvent::insert("vid-4", completed_doc("vid-4", &["s4"])));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn({
        let restarted = restarted.clone();
        async move { restarted.run(rx).await }
    });
    let probe = fresh_search.clone();
    wait_for(move || probe.content_count() == 1).await;
    tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert!(fresh_search.content("vid-4").is_some());
    assert!(fresh_search.content("vid-1").is_none());
}

#[tokio::test]
async fn test_corrupt_cursor_starts_from_scratch_without_crashing() {
    let h = Harness::new();
    std::fs::write(h._dir.path().join("resume_token.json"), b"garbage{{").unwrap();

    h.feed
        .push(ChangeEvent::insert("vid-1", completed_doc("vid-1", &["a"])));

    let search = h.search.clone();
    h.run_until(move || search.content_count() == 1).await;

    // The corrupt file was replaced by a valid cursor.
    assert_eq!(h.tokens.load().unwrap().0, serde_json::json!(0));
}

#[tokio::test]
async fn test_rejected_cursor_is_dropped_and_watch_restarts() {
    let h = Harness::new();
    // A string token is not a valid offset for the in-memory feed, so the
    // open is rejected as an invalid cursor.
    h.tokens
        .save(&scene_sync::domain::ResumeToken::from_id("bogus"))
        .unwrap();

    h.feed
        .push(ChangeEvent::insert("vid-1", completed_doc("vid-1", &["a"])));

    let search = h.search.clone();
    h.run_until(move || search.content_count() == 1).await;
}

#[tokio::test]
async fn test_malformed_document_does_not_stop_the_stream() {
    let h = Harness::new();

    let mut broken = completed_doc("vid-bad", &["x"]);
    broken.enriched_data.scene_list[0].scene_id = None;
    h.feed.push(ChangeEvent::insert("vid-bad", broken));
    h.feed
        .push(ChangeEvent::insert("vid-ok", completed_doc("vid-ok", &["a"])));

    let search = h.search.clone();
    h.run_until(move || search.content_count() == 1).await;

    assert!(h.search.content("vid-ok").is_some());
    // The cursor advanced past the failed event as well.
    assert_eq!(h.tokens.load().unwrap().0, serde_json::json!(1));
}

#[tokio::test]
async fn test_watcher_reconnects_after_transient_failures() {
    let h = Harness::new();
    h.feed.fail_next_opens(2);
    h.feed
        .push(ChangeEvent::insert("vid-1", completed_doc("vid-1", &["a"])));

    let search = h.search.clone();
    h.run_until(move || search.content_count() == 1).await;
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff_sleep() {
    let h = Harness::new();
    // A backoff far longer than the test: the only way out is the
    // shutdown signal cutting the sleep short.
    let supervisor = h
        .supervisor
        .clone()
        .with_backoff(Duration::from_secs(30), Duration::from_secs(60));
    h.feed.fail_next_opens(10);

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { supervisor.run(rx).await });

    // Let the first open fail and the supervisor settle into its sleep.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("supervisor kept sleeping through shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_full_sync_replays_only_completed_documents() {
    let h = Harness::new();
    h.source.insert("vid-1", completed_doc("vid-1", &["a", "b"]));
    h.source.insert("vid-2", completed_doc("vid-2", &["c"]));
    let mut pending = completed_doc("vid-3", &["d"]);
    pending.status = "processing".to_string();
    h.source.insert("vid-3", pending);

    let report = h.supervisor.full_sync().await.unwrap();

    assert_eq!(report.videos, 2);
    assert_eq!(report.scenes, 3);
    assert_eq!(report.contents, 2);
    assert_eq!(h.search.scene_count(), 3);
    assert!(h.search.content("vid-3").is_none());
    // Full sync never touches the cursor.
    assert!(h.tokens.load().is_none());
}
