//! Keyed caches with explicit eviction
//!
//! The engine caches at two boundaries: permission tokens and ROI geometry,
//! both keyed by the principal cache key. Either can be backed by any
//! [`EvictableCache`]; [`MemoryCache`] is the in-process LRU implementation.

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    pub capacity: usize,

    /// Time-to-live for cached values
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Get/put/evict-by-key cache contract
///
/// Evictions are idempotent and always report success.
pub trait EvictableCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn put(&self, key: &str, value: V);

    fn evict(&self, key: &str) -> bool;

    fn evict_all(&self) -> bool;
}

/// Cached value with TTL
#[derive(Clone)]
struct CachedEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CachedEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// In-process LRU cache with TTL expiration
pub struct MemoryCache<V> {
    entries: Mutex<LruCache<String, CachedEntry<V>>>,
    config: CacheConfig,
    stats: Arc<DashMap<String, usize>>,
}

impl<V: Clone + Send> MemoryCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            stats: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            entries: self.len(),
            max_entries: self.config.capacity,
        }
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl<V: Clone + Send> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<V: Clone + Send> EvictableCache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let lookup = {
            let mut entries = self.entries.lock();
            let live = entries
                .get(key)
                .map(|entry| (!entry.is_expired(self.config.ttl)).then(|| entry.value.clone()));

            match live {
                Some(Some(value)) => Ok(value),
                Some(None) => {
                    entries.pop(key);
                    Err(true)
                }
                None => Err(false),
            }
        };

        match lookup {
            Ok(value) => {
                self.increment_stat("hits");
                Some(value)
            }
            Err(expired) => {
                if expired {
                    self.increment_stat("expirations");
                }
                self.increment_stat("misses");
                None
            }
        }
    }

    fn put(&self, key: &str, value: V) {
        self.entries
            .lock()
            .put(key.to_string(), CachedEntry::new(value));
    }

    fn evict(&self, key: &str) -> bool {
        self.entries.lock().pop(key);
        true
    }

    fn evict_all(&self) -> bool {
        self.entries.lock().clear();
        true
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let cache: MemoryCache<Vec<String>> = MemoryCache::default();

        assert!(cache.get("alice").is_none());
        cache.put("alice", vec!["1".to_string()]);
        assert_eq!(cache.get("alice"), Some(vec!["1".to_string()]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ttl_expiration() {
        let cache = MemoryCache::new(CacheConfig {
            ttl: Duration::from_millis(20),
            ..Default::default()
        });

        cache.put("alice", 1u32);
        assert_eq!(cache.get("alice"), Some(1));

        std::thread::sleep(Duration::from_millis(50));

        assert!(cache.get("alice").is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_capacity() {
        let cache = MemoryCache::new(CacheConfig {
            capacity: 2,
            ..Default::default()
        });

        cache.put("a", 1);
        cache.put("b", 2);
        // Touch "a" so "b" is least recently used
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_evictions_are_idempotent() {
        let cache = MemoryCache::default();
        cache.put("a", 1);

        assert!(cache.evict("a"));
        assert!(cache.evict("a"));
        assert!(cache.get("a").is_none());

        cache.put("b", 2);
        assert!(cache.evict_all());
        assert!(cache.evict_all());
        assert!(cache.is_empty());
    }
}
