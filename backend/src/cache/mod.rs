//! Source cache - parsed CSV snapshots keyed by source URL.
//!
//! Repeated requests within one process skip the network. Entries are shared
//! as `Arc` and never mutated or invalidated; the upstream data changes at
//! most daily. Each URL owns a `OnceCell`: the map lock is only held to find
//! or create that cell, so a slow load of one URL never blocks reads of
//! another, and concurrent passes on the same URL wait for a single load.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use crate::api::logs::log_info;
use crate::parser::ParseResult;

type Slot = Arc<OnceCell<Arc<ParseResult>>>;

/// URL-keyed cache of parsed sources
#[derive(Default)]
pub struct SourceCache {
    entries: RwLock<HashMap<String, Slot>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `url`, if loaded.
    pub async fn get(&self, url: &str) -> Option<Arc<ParseResult>> {
        self.entries.read().await.get(url).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached entry, or run `load` once and keep its success.
    ///
    /// Failed loads are not cached, the next call tries again.
    pub async fn get_or_load<F, Fut, E>(&self, url: &str, load: F) -> Result<Arc<ParseResult>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ParseResult, E>>,
    {
        let slot = self.slot(url).await;
        if let Some(hit) = slot.get() {
            log_info(format!("💾 Cache hit: {}", url));
            return Ok(Arc::clone(hit));
        }

        let loaded = slot
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(loaded))
    }

    /// Cell for `url`, created empty on first use.
    async fn slot(&self, url: &str) -> Slot {
        if let Some(slot) = self.entries.read().await.get(url) {
            return Arc::clone(slot);
        }
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(url.to_string()).or_default())
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.entries
            .read()
            .await
            .get(url)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of loaded entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::parser::parse_str;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> ParseResult {
        parse_str("Country/Region,1/22/20\nItaly,0\n", ',', "utf-8".into()).unwrap()
    }

    #[tokio::test]
    async fn test_loads_once_per_url() {
        let cache = SourceCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let entry = cache
                .get_or_load("http://a.test/x.csv", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, FetchError>(snapshot())
                })
                .await
                .unwrap();
            assert_eq!(entry.rows.len(), 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let cache = SourceCache::new();

        let err = cache
            .get_or_load("http://a.test/x.csv", || async { Err::<ParseResult, _>(FetchError::EmptyCsv) })
            .await;
        assert!(err.is_err());
        assert!(!cache.contains("http://a.test/x.csv").await);

        let ok = cache
            .get_or_load("http://a.test/x.csv", || async { Ok::<_, FetchError>(snapshot()) })
            .await;
        assert!(ok.is_ok());
        assert!(cache.contains("http://a.test/x.csv").await);
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_other_urls() {
        let cache = Arc::new(SourceCache::new());
        cache
            .get_or_load("global", || async { Ok::<_, FetchError>(snapshot()) })
            .await
            .unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let slow = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_load("us", || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, FetchError>(snapshot())
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        // "us" is mid-load; "global" must still be served
        let hit = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            cache.get_or_load("global", || async { Err::<ParseResult, _>(FetchError::EmptyCsv) }),
        )
        .await
        .expect("cache read blocked by another URL's load")
        .unwrap();
        assert_eq!(hit.rows.len(), 1);
        assert!(!cache.contains("us").await);

        release_tx.send(()).unwrap();
        slow.await.unwrap().unwrap();
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_entries_are_shared() {
        let cache = SourceCache::new();
        let first = cache
            .get_or_load("u", || async { Ok::<_, FetchError>(snapshot()) })
            .await
            .unwrap();
        let second = cache.get("u").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
