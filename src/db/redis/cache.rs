use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use redis::AsyncCommands;
use redis::Client;
use std::collections::BTreeMap;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppResult;

/// Normalized request parameters for a cache key.
///
/// Parameters are kept sorted by name and normalized on insert, so two
/// requests that differ only by ordering, case, whitespace or coordinate
/// noise map to the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CacheParams(BTreeMap<String, String>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free-text parameter; blank values are left out
    pub fn text(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.insert(name.to_string(), value.to_lowercase());
        }
        self
    }

    /// Adds a coordinate rounded to three decimals (about 100 m)
    pub fn coord(mut self, name: &str, value: f64) -> Self {
        // + 0.0 folds -0.0 into 0.0
        let rounded = (value * 1000.0).round() / 1000.0 + 0.0;
        self.0.insert(name.to_string(), format!("{:.3}", rounded));
        self
    }

    /// Adds a radius as whole miles
    pub fn miles(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), format!("{}", value.round() as i64));
        self
    }

    pub fn number(mut self, name: &str, value: u32) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    /// base64url of the deterministic JSON serialization of the parameters
    pub fn encoded(&self) -> String {
        // BTreeMap<String, String> always serializes
        let json = serde_json::to_string(&self.0).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Eventbrite(CacheParams),
    Ticketmaster(CacheParams),
    Recipes(CacheParams),
    Restaurants(CacheParams),
    Movies(CacheParams),
}

impl CacheKey {
    pub fn namespace(&self) -> &'static str {
        match self {
            CacheKey::Eventbrite(_) => "eventbrite",
            CacheKey::Ticketmaster(_) => "ticketmaster",
            CacheKey::Recipes(_) => "recipes",
            CacheKey::Restaurants(_) => "restaurants",
            CacheKey::Movies(_) => "movies",
        }
    }

    fn params(&self) -> &CacheParams {
        match self {
            CacheKey::Eventbrite(p)
            | CacheKey::Ticketmaster(p)
            | CacheKey::Recipes(p)
            | CacheKey::Restaurants(p)
            | CacheKey::Movies(p) => p,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.params().encoded())
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
    /// Sorted set tracking every live key of the namespace by fetch time
    index: String,
    fetched_at: i64,
    capacity: usize,
}

/// Redis-backed document store for cached responses
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task, which flushes all pending
    /// writes to Redis before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl RedisCache {
    /// Creates a new RedisCache with an async write background task
    ///
    /// Writes (and the capacity eviction that follows each one) run on the
    /// background task so they never delay an API response.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(
                                error = %e,
                                "Failed to flush cache write during shutdown"
                            );
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes one entry, then trims the namespace index: expired members
    /// first, then the oldest members beyond capacity.
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(&msg.key, msg.value, msg.ttl).await?;
        let _: () = conn.zadd(&msg.index, &msg.key, msg.fetched_at).await?;

        let expired_before = msg.fetched_at - msg.ttl as i64;
        let _: () = conn
            .zrembyscore(&msg.index, "-inf", format!("({}", expired_before))
            .await?;

        let count: usize = conn.zcard(&msg.index).await?;
        if count > msg.capacity {
            let excess = (count - msg.capacity) as isize;
            let oldest: Vec<String> = conn.zrange(&msg.index, 0, excess - 1).await?;
            if !oldest.is_empty() {
                let _: () = conn.del(&oldest).await?;
                let _: () = conn.zrem(&msg.index, &oldest).await?;
                tracing::debug!(
                    evicted = oldest.len(),
                    index = %msg.index,
                    "Evicted oldest cache entries"
                );
            }
        }

        Ok(())
    }

    /// Retrieves the raw JSON stored under a key
    pub async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    /// Stores raw JSON asynchronously without blocking
    pub fn set_in_background(
        &self,
        key: String,
        value: String,
        ttl: u64,
        index: String,
        fetched_at: i64,
        capacity: usize,
    ) {
        let msg = CacheWriteMessage {
            key,
            value,
            ttl,
            index,
            fetched_at,
            capacity,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }

    pub async fn remove(&self, key: &str, index: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key).await?;
        let _: () = conn.zrem(index, key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_prefix() {
        let key = CacheKey::Eventbrite(CacheParams::new().text("scope", Some("music")));
        assert!(format!("{}", key).starts_with("eventbrite:"));
    }

    #[test]
    fn test_cache_key_ignores_case_and_whitespace() {
        let a = CacheKey::Recipes(CacheParams::new().text("query", Some("  Pasta ")));
        let b = CacheKey::Recipes(CacheParams::new().text("query", Some("pasta")));
        assert_eq!(format!("{}", a), format!("{}", b));
    }

    #[test]
    fn test_cache_key_ignores_parameter_order() {
        let a = CacheParams::new()
            .coord("lat", 30.2672)
            .coord("lon", -97.7431)
            .miles("radius", 25.0);
        let b = CacheParams::new()
            .miles("radius", 25.0)
            .coord("lon", -97.7431)
            .coord("lat", 30.2672);
        assert_eq!(a.encoded(), b.encoded());
    }

    #[test]
    fn test_cache_key_rounds_coordinate_noise() {
        let a = CacheParams::new().coord("lat", 30.26721);
        let b = CacheParams::new().coord("lat", 30.26719);
        assert_eq!(a.encoded(), b.encoded());

        let far = CacheParams::new().coord("lat", 30.2702);
        assert_ne!(a.encoded(), far.encoded());
    }

    #[test]
    fn test_cache_key_folds_negative_zero() {
        let a = CacheParams::new().coord("lon", -0.0001);
        let b = CacheParams::new().coord("lon", 0.0);
        assert_eq!(a.encoded(), b.encoded());
    }

    #[test]
    fn test_cache_key_skips_blank_text() {
        let a = CacheParams::new().text("date", Some("   ")).text("scope", None);
        assert_eq!(a, CacheParams::new());
    }

    #[test]
    fn test_encoded_is_base64url_of_sorted_json() {
        let params = CacheParams::new().text("b", Some("2")).text("a", Some("1"));
        let decoded = URL_SAFE_NO_PAD.decode(params.encoded()).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), r#"{"a":"1","b":"2"}"#);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_evicts_beyond_capacity() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = RedisCache::new(client.clone());
        let index = "test-evict:index".to_string();

        for i in 0..3 {
            cache.set_in_background(
                format!("test-evict:{}", i),
                format!("{{\"n\":{}}}", i),
                60,
                index.clone(),
                1_000 + i,
                2,
            );
        }

        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        assert_eq!(cache.get_raw("test-evict:0").await.unwrap(), None);
        assert!(cache.get_raw("test-evict:2").await.unwrap().is_some());

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn
            .del(&["test-evict:1", "test-evict:2", "test-evict:index"][..])
            .await
            .unwrap();
    }
}
