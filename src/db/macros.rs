/// Read-through caching around an async computation.
///
/// Looks `$key` up in `$cache` (an `Option<&Cache>`). On a hit the cached
/// value is returned. On a miss, or when the cache is absent or unreachable,
/// `$block` is awaited and its value queued for a background write with
/// `$ttl` seconds to live. Cache read failures are logged, never returned.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache.as_ref(), CacheKey::MovieDetails(id), TTL, async move {
///     fetch_details(id).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key = $key;

        let hit = match cache {
            Some(c) => match c.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, bypassing cache");
                    None
                }
            },
            None => None,
        };

        if let Some(cached) = hit {
            Ok(cached)
        } else {
            let value = $block.await?;
            if let Some(c) = cache {
                c.set_in_background(&key, &value, $ttl);
            }
            Ok(value)
        }
    }};
}
