//! Page cache keyed by [`PageKey`].
//!
//! Every stored page remembers the cache generation it was fetched in;
//! `invalidate` bumps the generation, which makes every stored page stale at
//! once. A stale page is still readable through `peek` (stale-while-revalidate)
//! but `fetch_page` treats it as a miss.
//!
//! Concurrent misses for the same key join one shared in-flight fetch, unless
//! that fetch began before the latest invalidation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use vault_core::{AppError, AppResult, CatalogTransport, PageKey, PageResult};

use crate::lock;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<PageResult>, AppError>>>;

struct Slot {
    page: Arc<PageResult>,
    generation: u64,
}

struct InFlight {
    id: u64,
    generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<PageKey, Slot>,
    in_flight: HashMap<PageKey, InFlight>,
    generation: u64,
    next_fetch_id: u64,
}

/// Shared handle onto one page cache. Clones see the same entries.
#[derive(Clone)]
pub struct PageCache {
    transport: Arc<dyn CatalogTransport>,
    state: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PageCache")
            .field("entries", &state.slots.len())
            .field("in_flight", &state.in_flight.len())
            .field("generation", &state.generation)
            .finish()
    }
}

impl PageCache {
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Cached page for `key` if it is still valid, otherwise fetch it.
    pub async fn fetch_page(&self, key: &PageKey) -> AppResult<Arc<PageResult>> {
        let fetch = {
            let mut state = lock(&self.state);
            let generation = state.generation;

            if let Some(slot) = state.slots.get(key) {
                if slot.generation == generation {
                    tracing::debug!(page = %key, "Page cache hit");
                    return Ok(Arc::clone(&slot.page));
                }
            }

            match state.in_flight.get(key) {
                Some(in_flight) if in_flight.generation == generation => {
                    tracing::debug!(page = %key, "Joining in-flight page fetch");
                    in_flight.fetch.clone()
                }
                _ => {
                    state.next_fetch_id += 1;
                    let id = state.next_fetch_id;
                    tracing::debug!(page = %key, fetch_id = id, "Page cache miss, fetching");
                    let fetch = self.start_fetch(key.clone(), id, generation);
                    state.in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        fetch.await
    }

    fn start_fetch(&self, key: PageKey, id: u64, generation: u64) -> SharedFetch {
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);

        async move {
            let result = transport.fetch_page(&key).await;

            // Slot write and in-flight removal happen under one lock.
            let mut state = lock(&state);
            if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
                state.in_flight.remove(&key);
            }

            match result {
                Ok(page) => {
                    let page = Arc::new(page);
                    let newer_stored = state
                        .slots
                        .get(&key)
                        .is_some_and(|slot| slot.generation > generation);
                    if !newer_stored {
                        state.slots.insert(
                            key,
                            Slot {
                                page: Arc::clone(&page),
                                generation,
                            },
                        );
                    }
                    Ok(page)
                }
                Err(err) => {
                    tracing::warn!(page = %key, error = %err, "Page fetch failed");
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Stored page for `key`, valid or stale.
    pub fn peek(&self, key: &PageKey) -> Option<Arc<PageResult>> {
        lock(&self.state)
            .slots
            .get(key)
            .map(|slot| Arc::clone(&slot.page))
    }

    /// Whether `fetch_page(key)` would be served without a network call.
    pub fn is_fresh(&self, key: &PageKey) -> bool {
        let state = lock(&self.state);
        state
            .slots
            .get(key)
            .is_some_and(|slot| slot.generation == state.generation)
    }

    /// Mark every cached page stale.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        tracing::info!(
            generation = state.generation,
            entries = state.slots.len(),
            "Page cache invalidated"
        );
    }

    /// Number of stored pages, stale ones included.
    pub fn len(&self) -> usize {
        lock(&self.state).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vault_core::{CatalogEntry, PendingFile, ProgressFn, UploadOutcome};

    /// Serves `total` synthetic entries, counting calls.
    struct CountingTransport {
        total: u64,
        calls: AtomicUsize,
    }

    impl CountingTransport {
        fn new(total: u64) -> Arc<Self> {
            Arc::new(Self {
                total,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogTransport for CountingTransport {
        async fn fetch_page(&self, key: &PageKey) -> AppResult<PageResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
            tokio::task::yield_now().await;
            let size = key.page_size as u64;
            let total_pages = self.total.div_ceil(size) as u32;
            let start = key.page_number as u64 * size;
            let end = (start + size).min(self.total);
            Ok(PageResult {
                entries: (start..end)
                    .map(|i| CatalogEntry {
                        id: i as i64,
                        // name records which call produced it
                        name: format!("entry-{}-call-{}", i, call),
                        description: String::new(),
                        image_url: String::new(),
                        folder_path: None,
                        created_at: None,
                    })
                    .collect(),
                page_number: key.page_number,
                page_size: key.page_size,
                total_elements: self.total,
                total_pages,
                is_last_page: key.page_number + 1 >= total_pages,
            })
        }

        async fn upload(&self, _files: Vec<PendingFile>, _progress: ProgressFn) -> AppResult<UploadOutcome> {
            Ok(UploadOutcome::default())
        }
    }

    #[tokio::test]
    async fn test_repeat_fetch_is_served_from_cache() {
        let transport = CountingTransport::new(13);
        let cache = PageCache::new(transport.clone());
        let key = PageKey::default();

        let first = cache.fetch_page(&key).await.unwrap();
        let second = cache.fetch_page(&key).await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_concurrent_same_key_fetches_collapse() {
        let transport = CountingTransport::new(13);
        let cache = PageCache::new(transport.clone());
        let key = PageKey::default();

        let (a, b, c) = tokio::join!(
            cache.fetch_page(&key),
            cache.fetch_page(&key),
            cache.fetch_page(&key)
        );
        assert_eq!(transport.calls(), 1);
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_fetch_independently() {
        let transport = CountingTransport::new(13);
        let cache = PageCache::new(transport.clone());
        let key = PageKey::default();

        let key1 = key.with_page(1);
        let (a, b) = tokio::join!(cache.fetch_page(&key), cache.fetch_page(&key1));
        assert_eq!(transport.calls(), 2);
        assert_eq!(a.unwrap().entries[0].id, 0);
        assert_eq!(b.unwrap().entries[0].id, 6);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch_of_requested_key_only() {
        let transport = CountingTransport::new(13);
        let cache = PageCache::new(transport.clone());
        let page0 = PageKey::default();
        let page1 = page0.with_page(1);

        cache.fetch_page(&page0).await.unwrap();
        let old_page1 = cache.fetch_page(&page1).await.unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh(&page0));
        assert!(!cache.is_fresh(&page1));

        let refreshed = cache.fetch_page(&page0).await.unwrap();
        assert_eq!(transport.calls(), 3);
        assert_eq!(refreshed.entries[0].name, "entry-0-call-2");
        assert!(cache.is_fresh(&page0));

        // page 1 was not touched: still the old, stale snapshot
        assert!(!cache.is_fresh(&page1));
        assert!(Arc::ptr_eq(&cache.peek(&page1).unwrap(), &old_page1));
    }

    #[tokio::test]
    async fn test_fetch_started_before_invalidate_is_not_joined() {
        let transport = CountingTransport::new(13);
        let cache = PageCache::new(transport.clone());
        let key = PageKey::default();

        let early = cache.fetch_page(&key);
        let late = async {
            cache.invalidate();
            cache.fetch_page(&key).await
        };
        let (early, late) = tokio::join!(early, late);

        assert_eq!(transport.calls(), 2);
        assert!(early.is_ok());
        assert_eq!(late.unwrap().entries[0].name, "entry-0-call-1");
        // the post-invalidation result is the one kept as fresh
        assert!(cache.is_fresh(&key));
        assert_eq!(cache.peek(&key).unwrap().entries[0].name, "entry-0-call-1");
    }

    struct FailingTransport;

    #[async_trait]
    impl CatalogTransport for FailingTransport {
        async fn fetch_page(&self, _key: &PageKey) -> AppResult<PageResult> {
            Err(AppError::Transport("connection reset".to_string()))
        }

        async fn upload(&self, _files: Vec<PendingFile>, _progress: ProgressFn) -> AppResult<UploadOutcome> {
            Err(AppError::Transport("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_stores_nothing() {
        let cache = PageCache::new(Arc::new(FailingTransport));
        let key = PageKey::default();
        let err = cache.fetch_page(&key).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(cache.peek(&key).is_none());
        assert!(cache.is_empty());
    }
}
