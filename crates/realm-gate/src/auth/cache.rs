//! TTL-bounded key-set cache.
//!
//! Wraps any [`KeySetSource`] and serves the last fetched set until it
//! expires. Concurrent callers that find the cache expired share a single
//! upstream fetch: the write lock is held across the fetch and re-checked
//! after acquisition.
//!
//! Failed fetches are never cached, and an expired set is never served in
//! place of a failed fetch.

use crate::auth::jwks::{KeySet, KeySetSource};
use crate::errors::AuthError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct CachedKeySet {
    keys: Arc<KeySet>,
    expires_at: Instant,
}

/// Key-set source that caches another source's result for a fixed TTL.
pub struct CachedKeySetSource<S> {
    inner: S,
    ttl: Duration,
    cache: RwLock<Option<CachedKeySet>>,
}

impl<S: KeySetSource> CachedKeySetSource<S> {
    /// Cache `inner`'s key set for `ttl`.
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached set so the next call fetches.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        tracing::debug!(target: "gate.auth.cache", "Key-set cache invalidated");
    }

    fn fresh(entry: Option<&CachedKeySet>) -> Option<Arc<KeySet>> {
        entry
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| Arc::clone(&cached.keys))
    }
}

#[async_trait]
impl<S: KeySetSource> KeySetSource for CachedKeySetSource<S> {
    async fn fetch(&self) -> Result<Arc<KeySet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(keys) = Self::fresh(cache.as_ref()) {
                tracing::trace!(target: "gate.auth.cache", "Key-set cache hit");
                return Ok(keys);
            }
        }

        let mut cache = self.cache.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(keys) = Self::fresh(cache.as_ref()) {
            tracing::trace!(target: "gate.auth.cache", "Key-set cache refreshed by concurrent caller");
            return Ok(keys);
        }

        tracing::debug!(target: "gate.auth.cache", "Key-set cache miss, fetching");

        let keys = self.inner.fetch().await.inspect_err(|e| {
            tracing::warn!(target: "gate.auth.cache", error = %e, "Key-set refresh failed");
        })?;

        *cache = Some(CachedKeySet {
            keys: Arc::clone(&keys),
            expires_at: Instant::now() + self.ttl,
        });

        Ok(keys)
    }
}
