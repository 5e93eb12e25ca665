use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::redis::{CacheKey, RedisCache};
use super::store::{load_json, save_json, KeyValueStore};
use crate::error::{AppError, AppResult};

/// A cached response with the time it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub data: Value,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// Expiry and size limits for one cache namespace
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub capacity: usize,
}

impl CachePolicy {
    pub fn new(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            capacity: capacity.max(1),
        }
    }
}

enum Backend {
    Redis(RedisCache),
    Local(LocalCache),
}

/// In-process entries, snapshotted to the key-value store after each change
struct LocalCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    store: Option<(Arc<dyn KeyValueStore>, String)>,
}

/// Response cache for one provider namespace.
///
/// Entries at or past the TTL are never returned. After every insert at most
/// `capacity` entries remain, oldest `fetched_at` dropped first.
#[derive(Clone)]
pub struct ResponseCache {
    namespace: &'static str,
    policy: CachePolicy,
    backend: Arc<Backend>,
}

impl ResponseCache {
    /// Cache stored in Redis under `<namespace>:*` keys
    pub fn redis(namespace: &'static str, policy: CachePolicy, cache: RedisCache) -> Self {
        Self {
            namespace,
            policy,
            backend: Arc::new(Backend::Redis(cache)),
        }
    }

    /// In-process cache, restored from and snapshotted to `store`
    pub fn local(
        namespace: &'static str,
        policy: CachePolicy,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let snapshot_key = format!("{}CacheV1", namespace);
        let entries: HashMap<String, CacheEntry> = match load_json::<BTreeMap<String, CacheEntry>>(
            store.as_ref(),
            &snapshot_key,
        ) {
            Ok(Some(saved)) => saved.into_iter().collect(),
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, namespace, "Could not restore cache snapshot");
                HashMap::new()
            }
        };

        tracing::debug!(namespace, restored = entries.len(), "Local response cache ready");

        Self {
            namespace,
            policy,
            backend: Arc::new(Backend::Local(LocalCache {
                entries: Mutex::new(entries),
                store: Some((store, snapshot_key)),
            })),
        }
    }

    /// In-process cache that is never persisted
    pub fn memory(namespace: &'static str, policy: CachePolicy) -> Self {
        Self {
            namespace,
            policy,
            backend: Arc::new(Backend::Local(LocalCache {
                entries: Mutex::new(HashMap::new()),
                store: None,
            })),
        }
    }

    fn index_key(&self) -> String {
        format!("{}:index", self.namespace)
    }

    /// Retrieves a fresh cached value by key
    pub async fn get_from_cache<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> AppResult<Option<T>> {
        debug_assert_eq!(key.namespace(), self.namespace);
        let key = key.to_string();

        let entry = match self.backend.as_ref() {
            Backend::Redis(redis) => self.redis_lookup(redis, &key, now).await,
            Backend::Local(local) => local.lookup(&key, now, self.policy.ttl)?,
        };

        match entry {
            Some(entry) => {
                tracing::debug!(namespace = self.namespace, "Cache hit");
                Ok(Some(serde_json::from_value(entry.data)?))
            }
            None => {
                tracing::debug!(namespace = self.namespace, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Redis is optional: an unreachable or misbehaving server reads as a
    /// miss so the provider is asked instead
    async fn redis_lookup(
        &self,
        redis: &RedisCache,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let raw = match redis.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    namespace = self.namespace,
                    "Redis read failed, treating as miss"
                );
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    namespace = self.namespace,
                    "Unreadable Redis cache entry"
                );
                return None;
            }
        };

        if entry.is_fresh(now, self.policy.ttl) {
            return Some(entry);
        }
        if let Err(e) = redis.remove(key, &self.index_key()).await {
            tracing::warn!(
                error = %e,
                namespace = self.namespace,
                "Could not drop expired Redis entry"
            );
        }
        None
    }

    /// Stores a value. Redis writes happen on the background writer; local
    /// writes are applied and snapshotted before returning.
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if let Err(e) = self.set_at(key, value, Utc::now()) {
            tracing::error!(error = %e, namespace = self.namespace, "Cache write failed");
        }
    }

    pub fn set_at<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        debug_assert_eq!(key.namespace(), self.namespace);
        let entry = CacheEntry {
            fetched_at: now,
            data: serde_json::to_value(value)?,
        };

        match self.backend.as_ref() {
            Backend::Redis(redis) => {
                let json = serde_json::to_string(&entry)?;
                redis.set_in_background(
                    key.to_string(),
                    json,
                    self.policy.ttl.num_seconds().max(1) as u64,
                    self.index_key(),
                    now.timestamp(),
                    self.policy.capacity,
                );
                Ok(())
            }
            Backend::Local(local) => local.insert(key.to_string(), entry, now, self.policy),
        }
    }

    /// Number of entries currently held locally. Always 0 for Redis.
    #[cfg(test)]
    fn local_len(&self) -> usize {
        match self.backend.as_ref() {
            Backend::Local(local) => local.entries.lock().map(|e| e.len()).unwrap_or(0),
            Backend::Redis(_) => 0,
        }
    }
}

impl LocalCache {
    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("Response cache lock poisoned".to_string()))
    }

    fn lookup(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<Option<CacheEntry>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, ttl) => Ok(Some(entry.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn insert(
        &self,
        key: String,
        entry: CacheEntry,
        now: DateTime<Utc>,
        policy: CachePolicy,
    ) -> AppResult<()> {
        let mut entries = self.lock()?;
        entries.insert(key, entry);
        evict(&mut entries, now, policy);

        // Saved under the lock so an older snapshot never lands after a newer one
        if let Some((store, snapshot_key)) = &self.store {
            let snapshot: BTreeMap<&String, &CacheEntry> = entries.iter().collect();
            save_json(store.as_ref(), snapshot_key, &snapshot)?;
        }
        Ok(())
    }
}

/// Drops expired entries, then the oldest entries beyond capacity
fn evict(entries: &mut HashMap<String, CacheEntry>, now: DateTime<Utc>, policy: CachePolicy) {
    entries.retain(|_, entry| entry.is_fresh(now, policy.ttl));

    if entries.len() <= policy.capacity {
        return;
    }

    let mut by_age: Vec<(DateTime<Utc>, String)> = entries
        .iter()
        .map(|(key, entry)| (entry.fetched_at, key.clone()))
        .collect();
    by_age.sort();

    let excess = entries.len() - policy.capacity;
    for (_, key) in by_age.into_iter().take(excess) {
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::redis::CacheParams;
    use crate::db::store::MemoryStore;

    fn key(query: &str) -> CacheKey {
        CacheKey::Eventbrite(CacheParams::new().text("q", Some(query)))
    }

    #[tokio::test]
    async fn test_fresh_entry_is_returned() {
        let cache = ResponseCache::memory("eventbrite", CachePolicy::new(60, 10));
        let now = Utc::now();
        cache.set_at(&key("jazz"), &vec!["a", "b"], now).unwrap();

        let later = now + Duration::seconds(59);
        let hit: Option<Vec<String>> = cache.get_at(&key("jazz"), later).await.unwrap();
        assert_eq!(hit, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn test_entry_at_ttl_is_never_returned() {
        let cache = ResponseCache::memory("eventbrite", CachePolicy::new(60, 10));
        let now = Utc::now();
        cache.set_at(&key("jazz"), &1, now).unwrap();

        let at_ttl = now + Duration::seconds(60);
        let miss: Option<i32> = cache.get_at(&key("jazz"), at_ttl).await.unwrap();
        assert_eq!(miss, None);
        assert_eq!(cache.local_len(), 0);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest_first() {
        let cache = ResponseCache::memory("eventbrite", CachePolicy::new(3600, 2));
        let start = Utc::now();
        cache.set_at(&key("first"), &1, start).unwrap();
        cache.set_at(&key("second"), &2, start + Duration::seconds(1)).unwrap();
        cache.set_at(&key("third"), &3, start + Duration::seconds(2)).unwrap();

        let now = start + Duration::seconds(3);
        assert_eq!(cache.local_len(), 2);
        assert_eq!(cache.get_at::<i32>(&key("first"), now).await.unwrap(), None);
        assert_eq!(cache.get_at::<i32>(&key("second"), now).await.unwrap(), Some(2));
        assert_eq!(cache.get_at::<i32>(&key("third"), now).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_rewriting_a_key_refreshes_its_age() {
        let cache = ResponseCache::memory("eventbrite", CachePolicy::new(3600, 2));
        let start = Utc::now();
        cache.set_at(&key("first"), &1, start).unwrap();
        cache.set_at(&key("second"), &2, start + Duration::seconds(1)).unwrap();
        cache.set_at(&key("first"), &10, start + Duration::seconds(2)).unwrap();
        cache.set_at(&key("third"), &3, start + Duration::seconds(3)).unwrap();

        let now = start + Duration::seconds(4);
        assert_eq!(cache.get_at::<i32>(&key("first"), now).await.unwrap(), Some(10));
        assert_eq!(cache.get_at::<i32>(&key("second"), now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_cache_survives_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let now = Utc::now();
        {
            let cache =
                ResponseCache::local("eventbrite", CachePolicy::new(3600, 5), store.clone());
            cache.set_at(&key("jazz"), &"cached", now).unwrap();
        }
        assert!(store.get("eventbriteCacheV1").unwrap().is_some());

        let restored = ResponseCache::local("eventbrite", CachePolicy::new(3600, 5), store);
        let hit: Option<String> = restored.get_at(&key("jazz"), now).await.unwrap();
        assert_eq!(hit, Some("cached".to_string()));
    }

    #[test]
    fn test_evict_removes_expired_before_capacity() {
        let now = Utc::now();
        let mut entries = HashMap::new();
        entries.insert(
            "stale".to_string(),
            CacheEntry {
                fetched_at: now - Duration::seconds(120),
                data: Value::Null,
            },
        );
        entries.insert(
            "fresh".to_string(),
            CacheEntry {
                fetched_at: now,
                data: Value::Null,
            },
        );

        evict(&mut entries, now, CachePolicy::new(60, 5));
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("fresh"));
    }

    async fn cached_numbers(cache: &ResponseCache) -> AppResult<Vec<i32>> {
        crate::cached!(cache, key("jazz"), async { Ok::<_, AppError>(vec![1, 2, 3]) })
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_fetch() {
        let client = crate::db::create_redis_client("redis://127.0.0.1:1").unwrap();
        let (redis, _writer) = RedisCache::new(client);
        let cache = ResponseCache::redis("eventbrite", CachePolicy::new(60, 5), redis);

        let miss: Option<Vec<i32>> = cache.get_from_cache(&key("jazz")).await.unwrap();
        assert_eq!(miss, None);
        assert_eq!(cached_numbers(&cache).await.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshot_matches_entries_after_parallel_inserts() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = ResponseCache::local("eventbrite", CachePolicy::new(3600, 100), store.clone());
        let now = Utc::now();

        std::thread::scope(|scope| {
            for i in 0..32 {
                let cache = cache.clone();
                scope.spawn(move || {
                    cache.set_at(&key(&format!("q{}", i)), &i, now).unwrap();
                });
            }
        });

        let snapshot: BTreeMap<String, CacheEntry> = load_json(store.as_ref(), "eventbriteCacheV1")
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 32);
        assert_eq!(cache.local_len(), 32);
    }
}
