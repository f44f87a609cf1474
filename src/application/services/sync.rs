use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::ports::{ChangeStream, ChangeStreamConsumer, SearchSyncClient, SourceCollection};
use crate::domain::transform;
use crate::domain::{ChangeEvent, OperationType, SourceDocument, SyncError};
use crate::infrastructure::token_store::FileTokenStore;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Exponential reconnect delay: `min(base * 2^attempt, cap)`. The counter
/// resets only on a successful re-entry into watching.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32 << self.attempt.min(16);
        let delay = self.base.saturating_mul(factor).min(self.cap);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullSyncReport {
    pub videos: usize,
    pub scenes: usize,
    pub contents: usize,
}

/// The watch loop: connects to the change feed, routes events through the
/// transformer and the search client, persists the cursor after every event,
/// and reconnects with backoff on failure. One supervisor instance owns one
/// subscription and one resume-token file.
#[derive(Clone)]
pub struct SyncSupervisor {
    source: Arc<dyn SourceCollection>,
    feed: Arc<dyn ChangeStreamConsumer>,
    search: Arc<dyn SearchSyncClient>,
    tokens: FileTokenStore,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl SyncSupervisor {
    pub fn new(
        source: Arc<dyn SourceCollection>,
        feed: Arc<dyn ChangeStreamConsumer>,
        search: Arc<dyn SearchSyncClient>,
        tokens: FileTokenStore,
    ) -> Self {
        Self {
            source,
            feed,
            search,
            tokens,
            backoff_base: BACKOFF_BASE,
            backoff_cap: BACKOFF_CAP,
        }
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Runs until the shutdown signal flips. Events are processed strictly
    /// in arrival order; the only suspension points are the wait for the
    /// next event and the backoff sleep, both cancellable by shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), SyncError> {
        let mut backoff = Backoff::new(self.backoff_base, self.backoff_cap);

        while !*shutdown.borrow() {
            let resume_from = self.tokens.load();
            if resume_from.is_some() {
                info!("resuming from saved token");
            }

            match self.feed.open(resume_from).await {
                Ok(mut stream) => {
                    info!("watching change feed");
                    backoff.reset();
                    if let Err(e) = self.consume(stream.as_mut(), &mut shutdown).await {
                        if *shutdown.borrow() {
                            break;
                        }
                        error!(error = %e, "change feed failed");
                        self.sleep_backoff(&mut backoff, &mut shutdown).await;
                    }
                }
                Err(SyncError::InvalidCursor(reason)) => {
                    // Deterministic failure: drop the cursor and reconnect
                    // from latest immediately, skipping the backoff charge.
                    warn!(%reason, "saved resume token rejected, restarting from latest");
                    self.tokens.clear();
                }
                Err(e) => {
                    error!(error = %e, "failed to open change feed");
                    self.sleep_backoff(&mut backoff, &mut shutdown).await;
                }
            }
        }

        info!("watcher stopped");
        Ok(())
    }

    async fn consume(
        &self,
        stream: &mut dyn ChangeStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), SyncError> {
        loop {
            let next = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                next = stream.next() => next,
            };

            match next? {
                Some((event, token)) => {
                    // One malformed document must never terminate the
                    // stream: log and move on.
                    if let Err(e) = self.handle_event(&event).await {
                        error!(
                            op = %event.operation,
                            key = %event.document_key,
                            error = %e,
                            "error handling change event"
                        );
                    }
                    // Persist the cursor after every event, success or
                    // handled failure.
                    if let Err(e) = self.tokens.save(&token) {
                        error!(error = %e, "failed to persist resume token");
                    }
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
                None => return Err(SyncError::transient("change feed closed")),
            }
        }
    }

    async fn sleep_backoff(&self, backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) {
        let delay = backoff.next_delay();
        info!(seconds = delay.as_secs_f64(), "reconnecting after backoff");
        tokio::select! {
            _ = shutdown.changed() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    /// Applies one change event. Re-applying the same event is safe: every
    /// write is an upsert/delete keyed by a stable id.
    #[instrument(skip(self, event), fields(op = %event.operation, key = %event.document_key))]
    pub async fn handle_event(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        match event.operation {
            OperationType::Insert | OperationType::Update | OperationType::Replace => {
                let doc = match &event.full_document {
                    Some(doc) => Some(doc.clone()),
                    // The document can vanish between the change and the
                    // lookup; fetch the current state by key.
                    None => self.source.find_by_key(&event.document_key).await?,
                };
                let Some(doc) = doc else {
                    warn!("document not found, skipping");
                    return Ok(());
                };
                self.apply_upsert(&doc).await
            }
            OperationType::Delete => match &event.pre_image {
                Some(pre) => self.apply_delete(pre).await,
                None => {
                    // Without a pre-image the scene ids and content id are
                    // unrecoverable; derived records stay stale until a
                    // full sync reconciles them.
                    warn!("delete without pre-image, run a full sync to reconcile derived records");
                    Ok(())
                }
            },
        }
    }

    async fn apply_upsert(&self, doc: &SourceDocument) -> Result<(), SyncError> {
        if !doc.is_completed() {
            // A document can leave eligibility after being synced; its
            // derived records go with it.
            debug!(status = %doc.status, "document not completed, removing derived records");
            return self.apply_delete(doc).await;
        }

        let scenes = transform::derive_scenes(doc)?;
        if scenes.is_empty() {
            debug!("no scenes to sync");
        } else {
            let written = self.search.upsert_scenes(&scenes).await?;
            if written < scenes.len() {
                warn!(written, total = scenes.len(), "partial scene upsert");
            } else {
                info!(scenes = written, video_id = %doc.content_id(), "upserted scenes");
            }
        }

        if let Some(content) = transform::derive_content(doc) {
            self.search.upsert_content(&content).await?;
            info!(content_id = %content.content_id, "upserted content");
        }

        Ok(())
    }

    async fn apply_delete(&self, doc: &SourceDocument) -> Result<(), SyncError> {
        let ids = transform::scene_ids(doc);
        if !ids.is_empty() {
            let deleted = self.search.delete_scenes(&ids).await?;
            info!(deleted, video_id = %doc.content_id(), "deleted scenes");
        }

        let content_id = doc.content_id();
        if !content_id.is_empty() {
            self.search.delete_content(&content_id).await?;
            info!(content_id = %content_id, "deleted content");
        }

        Ok(())
    }

    /// Replays every completed source document through the same transform +
    /// upsert path as the live watcher, without touching the cursor. Repairs
    /// drift from deletes that lacked a pre-image.
    #[instrument(skip(self))]
    pub async fn full_sync(&self) -> Result<FullSyncReport, SyncError> {
        info!("starting full sync");
        let mut report = FullSyncReport::default();

        for doc in self.source.completed_documents().await? {
            let scenes = match transform::derive_scenes(&doc) {
                Ok(scenes) => scenes,
                Err(e) => {
                    warn!(video_id = %doc.content_id(), error = %e, "skipping document");
                    continue;
                }
            };
            if !scenes.is_empty() {
                report.scenes += self.search.upsert_scenes(&scenes).await?;
                report.videos += 1;
            }
            if let Some(content) = transform::derive_content(&doc) {
                self.search.upsert_content(&content).await?;
                report.contents += 1;
            }
        }

        info!(
            videos = report.videos,
            scenes = report.scenes,
            contents = report.contents,
            "full sync done"
        );
        Ok(report)
    }
}
