//! Permission tokens and the per-principal permission cache

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheConfig, EvictableCache, MemoryCache};
use crate::error::Result;
use crate::types::{cache_key_for, Principal};

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresPermissionSource;

/// External source of a principal's permission tokens
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Ordered permission tokens granted to `principal`
    async fn get_user_permissions(&self, principal: &Principal) -> Result<Vec<String>>;
}

/// In-memory permission source keyed by login name
pub struct StaticPermissionSource {
    permissions: DashMap<String, Vec<String>>,
}

impl StaticPermissionSource {
    pub fn new() -> Self {
        Self {
            permissions: DashMap::new(),
        }
    }

    /// Replace the tokens granted to `login`
    pub fn grant(&self, login: impl Into<String>, tokens: Vec<String>) {
        self.permissions.insert(login.into(), tokens);
    }

    pub fn revoke(&self, login: &str) {
        self.permissions.remove(login);
    }
}

impl Default for StaticPermissionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionSource for StaticPermissionSource {
    async fn get_user_permissions(&self, principal: &Principal) -> Result<Vec<String>> {
        Ok(self
            .permissions
            .get(&principal.name)
            .map(|tokens| tokens.clone())
            .unwrap_or_default())
    }
}

/// Quotes a raw token as a string literal (`'` doubled inside)
pub fn quote_token(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Per-principal cache in front of a [`PermissionSource`]
///
/// Keyed by [`Principal::cache_key`]. Failed fetches are not cached.
pub struct PermissionCache {
    source: Arc<dyn PermissionSource>,
    cache: Arc<dyn EvictableCache<Vec<String>>>,
    fetches: AtomicUsize,
}

impl PermissionCache {
    pub fn new(source: Arc<dyn PermissionSource>, config: CacheConfig) -> Self {
        Self::with_cache(source, Arc::new(MemoryCache::new(config)))
    }

    /// Use an externally provided cache
    pub fn with_cache(
        source: Arc<dyn PermissionSource>,
        cache: Arc<dyn EvictableCache<Vec<String>>>,
    ) -> Self {
        Self {
            source,
            cache,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Permission tokens for `principal`
    ///
    /// An anonymous (`None`) principal has no permissions; neither the cache
    /// nor the source is consulted.
    pub async fn get_permissions(&self, principal: Option<&Principal>) -> Result<Vec<String>> {
        let Some(principal) = principal else {
            return Ok(Vec::new());
        };

        let key = cache_key_for(Some(principal));
        if let Some(tokens) = self.cache.get(key) {
            debug!("Permission cache hit for {}", key);
            return Ok(tokens);
        }

        debug!("Permission cache miss for {}, fetching", key);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let tokens = self.source.get_user_permissions(principal).await?;
        self.cache.put(key, tokens.clone());

        Ok(tokens)
    }

    pub fn evict(&self, key: &str) -> bool {
        debug!("Evicting permission cache entry {}", key);
        self.cache.evict(key)
    }

    pub fn evict_all(&self) -> bool {
        debug!("Evicting all permission cache entries");
        self.cache.evict_all()
    }

    /// Number of calls made to the underlying source
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}
