//! Account metadata and credit cache
//!
//! Providers expose a small account endpoint (remaining credits, available
//! models). Lookups go through a read-through cache: readers take the shared
//! fast path while the snapshot is fresh and refresh under the write lock
//! once it goes stale. A refresh never exposes a half-written value —
//! readers see either the prior snapshot or the fully written new one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::GenError;

/// Account state fetched from a provider metadata endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSnapshot {
    /// Remaining prepaid credits, in the provider's billing unit
    pub remaining_credits: f64,
    /// Models currently available to this account
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub context_length: Option<u32>,
}

struct CacheSlot {
    snapshot: Arc<AccountSnapshot>,
    fetched_at: Instant,
}

/// Read-through cache with a staleness timestamp
pub struct MetadataCache {
    ttl: Duration,
    slot: RwLock<Option<CacheSlot>>,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached snapshot, refreshing it when stale.
    ///
    /// The write lock is taken only for refresh; the freshness check is
    /// repeated after acquisition so concurrent readers that raced on a
    /// stale snapshot trigger a single fetch.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<AccountSnapshot>, GenError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountSnapshot, GenError>>,
    {
        {
            let guard = self.slot.read().await;
            if let Some(slot) = guard.as_ref()
                && slot.fetched_at.elapsed() < self.ttl
            {
                return Ok(slot.snapshot.clone());
            }
        }

        let mut guard = self.slot.write().await;
        if let Some(slot) = guard.as_ref()
            && slot.fetched_at.elapsed() < self.ttl
        {
            return Ok(slot.snapshot.clone());
        }

        let snapshot = Arc::new(refresh().await?);
        *guard = Some(CacheSlot {
            snapshot: snapshot.clone(),
            fetched_at: Instant::now(),
        });
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next read refreshes.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(credits: f64) -> AccountSnapshot {
        AccountSnapshot {
            remaining_credits: credits,
            models: vec![],
        }
    }

    #[tokio::test]
    async fn fresh_cache_skips_refresh() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(snapshot(10.0))
                })
                .await
                .expect("snapshot");
            assert_eq!(got.remaining_credits, 10.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_cache_refreshes() {
        let cache = MetadataCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(snapshot(5.0))
                })
                .await
                .expect("snapshot");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cache_empty() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_refresh(|| async { Err(GenError::api_error(500, "boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));

        let got = cache
            .get_or_refresh(|| async { Ok(snapshot(7.0)) })
            .await
            .expect("snapshot");
        assert_eq!(got.remaining_credits, 7.0);
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let cache = MetadataCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let refresh = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot(1.0))
        };
        cache.get_or_refresh(refresh).await.expect("snapshot");
        cache.invalidate().await;
        cache
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(snapshot(2.0))
            })
            .await
            .expect("snapshot");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
