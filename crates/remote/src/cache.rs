//! TTL result cache for remote read operations.
//!
//! Entries expire once `now - created_at > ttl` and are dropped lazily on
//! read. The map sits behind one mutex; a stale read racing an invalidation
//! is tolerated, a torn write is not.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    created_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, or `None` if missing or expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.created_at.elapsed() <= self.ttl {
            return Some(entry.data.clone());
        }
        entries.remove(key);
        None
    }

    pub fn set(&self, key: impl Into<String>, data: T) {
        self.lock().insert(
            key.into(),
            CacheEntry {
                data,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop one key, or everything when `key` is `None`.
    pub fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.lock();
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// Number of stored entries, expired ones included until read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or run `fetch` and cache its success.
    ///
    /// The lock is not held across `fetch`; concurrent misses may fetch
    /// twice and the last one wins.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }
        let data = fetch().await?;
        self.set(key, data.clone());
        Ok(data)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // A poisoned map only means a panic mid-insert on another thread;
        // every entry is still whole.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Canonical cache key: `None` parameters dropped, keys sorted, pairs
/// rendered as `key=<json value>` and joined with `&`.
pub fn generate_key<'a>(params: impl IntoIterator<Item = (&'a str, Option<Value>)>) -> String {
    let mut pairs: Vec<(&str, Value)> = params
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn key_ignores_parameter_order() {
        let a = generate_key([("a", Some(json!(1))), ("b", Some(json!(2)))]);
        let b = generate_key([("b", Some(json!(2))), ("a", Some(json!(1)))]);
        assert_eq!(a, b);
        assert_eq!(a, "a=1&b=2");
    }

    #[test]
    fn key_drops_absent_parameters() {
        let key = generate_key([
            ("search", Some(json!("cat"))),
            ("page", None),
            ("favorite", Some(json!(true))),
        ]);
        assert_eq!(key, r#"favorite=true&search="cat""#);
        assert_eq!(generate_key([("x", None)]), "");
    }

    #[tokio::test(start_paused = true)]
    async fn set_then_get_until_expiry() {
        let cache = TtlCache::new(Duration::from_secs(30));
        cache.set("k", 7);
        assert_eq!(cache.get("k"), Some(7));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("k"), Some(7), "exactly ttl is still fresh");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "expired entry removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn hit_at_5s_miss_at_35s() {
        let cache = TtlCache::new(Duration::from_secs(30));
        let counter = AtomicUsize::new(0);
        let fetches = &counter;
        let fetch = move || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec!["a.png".to_string()])
        };

        cache.get_or_fetch("files", fetch).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.get_or_fetch("files", fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.get_or_fetch("files", fetch).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(30));
        let err = cache.get_or_fetch("k", || async { Err::<u32, _>("boom") }).await;
        assert_eq!(err, Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_one_or_all() {
        let cache = TtlCache::new(Duration::from_secs(30));
        cache.set("a", 1);
        cache.set("b", 2);

        cache.invalidate(Some("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.invalidate(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_access_is_safe() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(30)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("k{}", i % 10);
                        cache.set(key.clone(), t * 1000 + i);
                        let _ = cache.get(&key);
                        if i % 50 == 0 {
                            cache.invalidate(None);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 10);
    }
}
