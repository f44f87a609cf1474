mod in_memory;
mod redis;

pub use in_memory::{InMemoryChangeFeed, InMemorySource};
pub use redis::{create_pool, RedisChangeFeed, RedisSourceStore};
