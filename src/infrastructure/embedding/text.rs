use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, Embedding, SyncError};
use crate::infrastructure::config::EmbeddingConfig;

/// OpenAI-backed embedding service for the dense-search fields. The search
/// client embeds scene and content text right before writing; transformer
/// output never carries vectors.
pub struct TextEmbedding {
    client: openai::Client,
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    /// Reads the API credentials from the environment once; the client is
    /// reused across every batch.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            client: openai::Client::from_env(),
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, SyncError> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| SyncError::internal("no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, SyncError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.client.embedding_model(&self.model);
        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(*text)
                .map_err(|e| SyncError::transient(e.to_string()))?;
        }

        let embedded = builder
            .build()
            .await
            .map_err(|e| SyncError::transient(e.to_string()))?;

        Ok(embedded
            .into_iter()
            .map(|(_text, emb)| {
                Embedding::new(emb.first().vec.into_iter().map(|x| x as f32).collect())
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
