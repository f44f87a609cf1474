#[derive(Debug, Clone)]
pub struct Config {
    /// Search backend selection: "qdrant" or "memory".
    pub backend: String,
    pub qdrant_url: String,
    pub scenes_collection: String,
    pub contents_collection: String,
    pub embedding: EmbeddingConfig,
    pub redis_url: String,
    /// Redis Stream carrying the source collection's change events.
    pub change_stream_key: String,
    /// Redis hash mirroring the source collection, keyed by document key.
    pub source_mirror_key: String,
    pub resume_token_path: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            scenes_collection: "scenes".to_string(),
            contents_collection: "contents".to_string(),
            embedding: EmbeddingConfig {
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
            },
            redis_url: "redis://localhost:6379".to_string(),
            change_stream_key: "video_queue:changes".to_string(),
            source_mirror_key: "video_queue:documents".to_string(),
            resume_token_path: "resume_token.json".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        fn var(name: &str, default: String) -> String {
            std::env::var(name).unwrap_or(default)
        }

        Self {
            backend: var("SEARCH_BACKEND", defaults.backend),
            qdrant_url: var("QDRANT_URL", defaults.qdrant_url),
            scenes_collection: var("SCENES_COLLECTION", defaults.scenes_collection),
            contents_collection: var("CONTENTS_COLLECTION", defaults.contents_collection),
            embedding: EmbeddingConfig {
                model: var("EMBEDDING_MODEL", defaults.embedding.model),
                dimension: std::env::var("EMBEDDING_DIMENSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.embedding.dimension),
            },
            redis_url: var("REDIS_URL", defaults.redis_url),
            change_stream_key: var("CHANGE_STREAM_KEY", defaults.change_stream_key),
            source_mirror_key: var("SOURCE_MIRROR_KEY", defaults.source_mirror_key),
            resume_token_path: var("RESUME_TOKEN_PATH", defaults.resume_token_path),
        }
    }
}
