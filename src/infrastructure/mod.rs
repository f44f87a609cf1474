pub mod config;
pub mod embedding;
pub mod search;
pub mod source;
pub mod token_store;

pub use config::{Config, EmbeddingConfig};
pub use embedding::TextEmbedding;
pub use search::{InMemorySearchClient, QdrantSearchClient};
pub use source::{create_pool, InMemoryChangeFeed, InMemorySource, RedisChangeFeed, RedisSourceStore};
pub use token_store::FileTokenStore;
