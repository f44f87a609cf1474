mod in_memory;
mod qdrant;

pub use in_memory::InMemorySearchClient;
pub use qdrant::QdrantSearchClient;
