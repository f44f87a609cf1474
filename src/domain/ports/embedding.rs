use crate::domain::{errors::SyncError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, SyncError>;
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, SyncError>;
    fn dimension(&self) -> usize;
}
