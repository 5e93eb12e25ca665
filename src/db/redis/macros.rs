/// A macro to simplify get-or-fetch caching.
///
/// This macro checks if a fresh value is present in the cache.
/// If found, it returns the cached value.
/// If not found, it executes the provided block to compute the value,
/// stores it in the cache, and then returns the computed value.
///
/// # Arguments
/// * `$cache`: The `ResponseCache` to use for retrieval and storage. Its
///   policy decides the TTL and capacity.
/// * `$key`: The `CacheKey` to use for caching the value.
/// * `$block`: The future to await if the value is not found in cache.
///
/// # Example
/// ```rust,ignore
/// let events = cached!(self.cache, cache_key, async move {
///     fetch_events(&query).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value);
            Ok(value)
        }
    }};
}
