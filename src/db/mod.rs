pub mod cache;
pub mod redis;
pub mod store;

pub use cache::{CachePolicy, ResponseCache};
pub use redis::create_redis_client;
pub use redis::{CacheKey, CacheParams};
pub use store::{FileStore, KeyValueStore, MemoryStore};
