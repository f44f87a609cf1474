use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct, PointsIdsList,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::{
    ports::{EmbeddingService, SearchSyncClient},
    ContentSummary, Scene, SyncError,
};

/// Qdrant-backed search client. Scenes and contents live in two separate
/// collections; point ids are derived deterministically from the stable
/// string keys, so re-applying an event overwrites instead of duplicating.
pub struct QdrantSearchClient {
    client: Qdrant,
    scenes_collection: String,
    contents_collection: String,
    embedding: Arc<dyn EmbeddingService>,
}

impl QdrantSearchClient {
    pub async fn new(
        url: &str,
        scenes_collection: &str,
        contents_collection: &str,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Result<Self, SyncError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| SyncError::transient(e.to_string()))?;

        let store = Self {
            client,
            scenes_collection: scenes_collection.to_string(),
            contents_collection: contents_collection.to_string(),
            embedding,
        };

        store.ensure_collection(&store.scenes_collection).await?;
        store.ensure_collection(&store.contents_collection).await?;

        Ok(store)
    }

    async fn ensure_collection(&self, name: &str) -> Result<(), SyncError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;

        let exists = collections.collections.iter().any(|c| c.name == name);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                        self.embedding.dimension() as u64,
                        Distance::Cosine,
                    )),
                )
                .await
                .map_err(|e| SyncError::transient(e.to_string()))?;
        }

        Ok(())
    }

    /// Stable point id for an arbitrary string key.
    fn point_id(key: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
    }

    fn scene_point(&self, scene: &Scene, vector: Vec<f32>) -> Result<PointStruct, SyncError> {
        let payload: Payload = serde_json::json!({
            "scene_id": scene.scene_id,
            "scene_description": scene.scene_description,
            "start_time_sec": scene.start_time_sec,
            "end_time_sec": scene.end_time_sec,
            "video_id": scene.video.video_id,
            "video_title": scene.video.video_title,
            "video_description": scene.video.video_description,
            "video_tags": scene.video.video_tags,
            "video_duration_sec": scene.video.video_duration_sec.unwrap_or(0.0),
            "video_created_at": scene.video.video_created_at.clone().unwrap_or_default(),
            "category": scene.category,
            "created_date": scene.created_date,
            "author": scene.author,
        })
        .try_into()
        .map_err(|_| SyncError::internal("Failed to build scene payload"))?;

        Ok(PointStruct::new(
            Self::point_id(&scene.scene_id),
            vector,
            payload,
        ))
    }

    fn content_point(
        &self,
        content: &ContentSummary,
        vector: Vec<f32>,
    ) -> Result<PointStruct, SyncError> {
        let payload: Payload = serde_json::json!({
            "content_id": content.content_id,
            "title": content.title,
            "description": content.description,
            "tags": content.tags,
            "duration_sec": content.duration_sec,
            "created_at": content.created_at,
            "category": content.category,
            "author": content.author,
        })
        .try_into()
        .map_err(|_| SyncError::internal("Failed to build content payload"))?;

        Ok(PointStruct::new(
            Self::point_id(&content.content_id),
            vector,
            payload,
        ))
    }

    async fn delete_by_ids(&self, collection: &str, keys: &[String]) -> Result<(), SyncError> {
        let ids: Vec<PointId> = keys
            .iter()
            .map(|key| PointId::from(Self::point_id(key)))
            .collect();

        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(PointsIdsList { ids }))
            .await
            .map_err(|e| SyncError::backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SearchSyncClient for QdrantSearchClient {
    async fn upsert_scenes(&self, scenes: &[Scene]) -> Result<usize, SyncError> {
        if scenes.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = scenes.iter().map(Scene::embedding_text).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedding.embed_batch(&refs).await?;
        if vectors.len() != scenes.len() {
            return Err(SyncError::backend("embedding count mismatch"));
        }

        let mut points = Vec::with_capacity(scenes.len());
        for (scene, vector) in scenes.iter().zip(&vectors) {
            points.push(self.scene_point(scene, vector.as_slice().to_vec())?);
        }

        match self
            .client
            .upsert_points(UpsertPointsBuilder::new(&self.scenes_collection, points.clone()))
            .await
        {
            Ok(_) => Ok(scenes.len()),
            Err(batch_err) => {
                // The batch was refused as a whole; retry per record so one
                // bad point cannot sink the rest.
                warn!(error = %batch_err, "batch upsert failed, retrying per scene");
                let mut written = 0;
                for (scene, point) in scenes.iter().zip(points) {
                    match self
                        .client
                        .upsert_points(UpsertPointsBuilder::new(
                            &self.scenes_collection,
                            vec![point],
                        ))
                        .await
                    {
                        Ok(_) => written += 1,
                        Err(e) => {
                            error!(scene_id = %scene.scene_id, error = %e, "scene upsert failed")
                        }
                    }
                }
                if written == 0 {
                    Err(SyncError::backend(batch_err.to_string()))
                } else {
                    Ok(written)
                }
            }
        }
    }

    async fn delete_scenes(&self, scene_ids: &[String]) -> Result<usize, SyncError> {
        if scene_ids.is_empty() {
            return Ok(0);
        }
        self.delete_by_ids(&self.scenes_collection, scene_ids)
            .await?;
        Ok(scene_ids.len())
    }

    async fn upsert_content(&self, content: &ContentSummary) -> Result<(), SyncError> {
        let vector = self.embedding.embed(&content.embedding_text()).await?;
        let point = self.content_point(content, vector.into_inner())?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(
                &self.contents_collection,
                vec![point],
            ))
            .await
            .map_err(|e| SyncError::backend(e.to_string()))?;

        Ok(())
    }

    async fn delete_content(&self, content_id: &str) -> Result<(), SyncError> {
        self.delete_by_ids(&self.contents_collection, &[content_id.to_string()])
            .await
    }
}
