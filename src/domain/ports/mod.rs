mod change_stream;
mod embedding;
mod search_sync;
mod source_collection;

pub use change_stream::{ChangeStream, ChangeStreamConsumer};
pub use embedding::EmbeddingService;
pub use search_sync::SearchSyncClient;
pub use source_collection::SourceCollection;
