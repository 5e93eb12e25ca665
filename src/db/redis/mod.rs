pub mod cache;

mod macros;

pub use cache::create_redis_client;
pub use cache::CacheKey;
pub use cache::CacheParams;
pub use cache::CacheWriterHandle;
pub use cache::RedisCache;
