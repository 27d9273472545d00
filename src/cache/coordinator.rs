//! Cache-or-fetch with in-flight request deduplication
//!
//! At most one fetch per key is outstanding at any instant: the pending
//! future is registered in the in-flight map before anything is awaited,
//! and callers arriving while it runs await the same shared future.

use crate::cache::store::{CachedValue, ResponseCache};
use crate::error::{DeckError, DeckResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::debug;

type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, DeckError>>>;
type Completed = Result<(CachedValue, Duration), DeckError>;

struct InFlight {
    id: u64,
    fetch: SharedFetch,
    /// Cleared by `invalidate`; the result then only reaches its waiters
    cacheable: bool,
}

struct Inner {
    cache: Arc<ResponseCache>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_id: AtomicU64,
    /// Bumped by `clear`, under the in-flight lock
    epoch: AtomicU64,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called exactly once per fetch, on success and on failure.
    ///
    /// A fetch invalidated while running keeps its key until it settles but
    /// is not cached. A fetch detached by `clear` no longer owns its key.
    fn complete(&self, key: &str, id: u64, result: &Completed) {
        let mut in_flight = self.in_flight();
        let cacheable = match in_flight.get(key) {
            Some(entry) if entry.id == id => entry.cacheable,
            _ => {
                debug!(key, "Discarding result of detached fetch");
                return;
            }
        };

        in_flight.remove(key);
        if !cacheable {
            debug!(key, "Fetch was invalidated while running, not cached");
            return;
        }
        match result {
            Ok((value, ttl)) => self.cache.set_raw(key, Arc::clone(value), *ttl),
            Err(e) => debug!(key, error = %e, "Fetch failed, not cached"),
        }
    }
}

/// Wraps remote fetches with the response cache
#[derive(Clone)]
pub struct RequestCoordinator {
    inner: Arc<Inner>,
}

impl RequestCoordinator {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                in_flight: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// The underlying response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result for `ttl`.
    ///
    /// Concurrent calls for the same key share one invocation of `fetch` and
    /// all observe its result, including its error.
    pub async fn cached_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> DeckResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        self.cached_fetch_with(key, move |_: &T| ttl, fetch).await
    }

    /// Like `cached_fetch`, with the TTL chosen from the fetched value
    pub async fn cached_fetch_with<T, L, F, Fut>(&self, key: &str, ttl_for: L, fetch: F) -> DeckResult<T>
    where
        T: Clone + Send + Sync + 'static,
        L: FnOnce(&T) -> Duration + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        self.cached_fetch_since(self.epoch(), key, ttl_for, fetch).await
    }

    /// Current clear count; a fetch started from an older epoch is never shared or cached
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Like `cached_fetch_with` for a fetch whose inputs were taken at `epoch`.
    ///
    /// When `clear` ran since then, `fetch` still runs for this caller but
    /// neither joins nor registers an in-flight entry and is not cached.
    pub async fn cached_fetch_since<T, L, F, Fut>(
        &self,
        epoch: u64,
        key: &str,
        ttl_for: L,
        fetch: F,
    ) -> DeckResult<T>
    where
        T: Clone + Send + Sync + 'static,
        L: FnOnce(&T) -> Duration + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        if let Some(hit) = self.inner.cache.get::<T>(key) {
            debug!(key, "Cache hit");
            return Ok(hit);
        }

        let pending = {
            let mut in_flight = self.inner.in_flight();
            if self.epoch() != epoch {
                debug!(key, "Cache cleared since the fetch was prepared, not sharing it");
                Err(fetch().boxed())
            } else {
                Ok(match in_flight.get(key) {
                    Some(pending) => {
                        debug!(key, "Joining in-flight fetch");
                        pending.fetch.clone()
                    }
                    None => {
                        // A fetch may have completed between the lookup above and taking the lock
                        if let Some(hit) = self.inner.cache.get::<T>(key) {
                            return Ok(hit);
                        }

                        debug!(key, "Cache miss, fetching");
                        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                        let fetch = self.start(key, id, ttl_for, fetch());
                        in_flight.insert(
                            key.to_string(),
                            InFlight {
                                id,
                                fetch: fetch.clone(),
                                cacheable: true,
                            },
                        );
                        fetch
                    }
                })
            }
        };

        let shared = match pending {
            Ok(shared) => shared,
            Err(uncached) => return uncached.await,
        };
        let value = shared.await?;
        value.downcast::<T>().map(|typed| T::clone(&typed)).map_err(|_| {
            DeckError::Internal(format!("cache key {} is shared by different types", key))
        })
    }

    fn start<T, L, Fut>(&self, key: &str, id: u64, ttl_for: L, fetch: Fut) -> SharedFetch
    where
        T: Send + Sync + 'static,
        L: FnOnce(&T) -> Duration + Send + 'static,
        Fut: Future<Output = DeckResult<T>> + Send + 'static,
    {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let key = key.to_string();

        async move {
            let result: Completed = fetch.await.map(|value| {
                let ttl = ttl_for(&value);
                (Arc::new(value) as CachedValue, ttl)
            });
            if let Some(inner) = inner.upgrade() {
                inner.complete(&key, id, &result);
            }
            result.map(|(value, _)| value)
        }
        .boxed()
        .shared()
    }

    /// Invalidate cached entries (exact key, else prefix).
    ///
    /// Matching in-flight fetches stay registered, so later callers still
    /// join them, but their results are no longer cached.
    pub fn invalidate(&self, key_or_prefix: &str) {
        self.inner.cache.invalidate(key_or_prefix);

        let mut in_flight = self.inner.in_flight();
        if let Some(entry) = in_flight.get_mut(key_or_prefix) {
            entry.cacheable = false;
            return;
        }
        for (_, entry) in in_flight
            .iter_mut()
            .filter(|(key, _)| key.starts_with(key_or_prefix))
        {
            entry.cacheable = false;
        }
    }

    /// Drop every cached value and detach every in-flight fetch
    pub fn clear(&self) {
        let mut in_flight = self.inner.in_flight();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.cache.clear();
        in_flight.clear();
    }

    /// Number of fetches currently outstanding
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    fn coordinator() -> RequestCoordinator {
        RequestCoordinator::new(Arc::new(ResponseCache::new()))
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
        delay: Duration,
    ) -> impl FnOnce() -> BoxFuture<'static, DeckResult<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(delay).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let (a, b, c) = tokio::join!(
            coordinator.cached_fetch("jobs:all", ttl, counting_fetch(&calls, 7, Duration::from_secs(1))),
            coordinator.cached_fetch("jobs:all", ttl, counting_fetch(&calls, 8, Duration::from_secs(1))),
            coordinator.cached_fetch("jobs:all", ttl, counting_fetch(&calls, 9, Duration::from_secs(1))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (7, 7, 7));
        assert_eq!(coordinator.in_flight_count(), 0);
        assert_eq!(coordinator.cache().get::<u32>("jobs:all"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_value_served_until_ttl() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(10);

        let first = coordinator
            .cached_fetch("queue:all", ttl, counting_fetch(&calls, 1, Duration::ZERO))
            .await
            .unwrap();
        let second = coordinator
            .cached_fetch("queue:all", ttl, counting_fetch(&calls, 2, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!((first, second), (1, 1));

        tokio::time::advance(ttl + Duration::from_millis(1)).await;
        let third = coordinator
            .cached_fetch("queue:all", ttl, counting_fetch(&calls, 3, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(third, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_shared_and_does_not_block_retry() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let failing = |calls: &Arc<AtomicUsize>| {
            let calls = Arc::clone(calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    sleep(Duration::from_millis(50)).await;
                    Err::<u32, _>(DeckError::Status {
                        code: 503,
                        url: "https://ci/api/json".into(),
                    })
                }
            }
        };

        let (a, b) = tokio::join!(
            coordinator.cached_fetch("jobs:all", ttl, failing(&calls)),
            coordinator.cached_fetch("jobs:all", ttl, failing(&calls)),
        );
        assert!(matches!(a, Err(DeckError::Status { code: 503, .. })));
        assert!(matches!(b, Err(DeckError::Status { code: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight_count(), 0);

        let retry = coordinator
            .cached_fetch("jobs:all", ttl, counting_fetch(&calls, 5, Duration::ZERO))
            .await;
        assert_eq!(retry.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_chosen_from_value() {
        let coordinator = coordinator();
        let ttl_for = |v: &u32| {
            if *v > 100 {
                Duration::from_secs(3600)
            } else {
                Duration::from_secs(5)
            }
        };

        coordinator
            .cached_fetch_with("stages:a:1", ttl_for, || async { Ok(500u32) })
            .await
            .unwrap();
        coordinator
            .cached_fetch_with("stages:a:2", ttl_for, || async { Ok(1u32) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(coordinator.cache().get::<u32>("stages:a:1"), Some(500));
        assert_eq!(coordinator.cache().get::<u32>("stages:a:2"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_fetch_independently() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let (a, b) = tokio::join!(
            coordinator.cached_fetch("builds:a:20", ttl, counting_fetch(&calls, 1, Duration::from_secs(1))),
            coordinator.cached_fetch("builds:b:20", ttl, counting_fetch(&calls, 2, Duration::from_secs(1))),
        );
        assert_eq!((a.unwrap(), b.unwrap()), (1, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_during_fetch_discards_stale_result() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let pending = coordinator.cached_fetch(
            "jobs:all",
            ttl,
            counting_fetch(&calls, 1, Duration::from_secs(1)),
        );
        let clear_midway = async {
            sleep(Duration::from_millis(500)).await;
            coordinator.clear();
        };
        let (value, _) = tokio::join!(pending, clear_midway);

        assert_eq!(value.unwrap(), 1, "waiters still get their answer");
        assert_eq!(coordinator.cache().get::<u32>("jobs:all"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_mid_flight_keeps_one_fetch_and_skips_cache() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let first = coordinator.cached_fetch(
            "jobs:all",
            ttl,
            counting_fetch(&calls, 1, Duration::from_secs(1)),
        );
        let second = async {
            sleep(Duration::from_millis(100)).await;
            coordinator.invalidate("jobs:all");
            assert_eq!(coordinator.in_flight_count(), 1);
            coordinator
                .cached_fetch("jobs:all", ttl, counting_fetch(&calls, 2, Duration::from_secs(1)))
                .await
        };
        let (a, b) = tokio::join!(first, second);

        assert_eq!((a.unwrap(), b.unwrap()), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight_count(), 0);
        assert_eq!(coordinator.cache().get::<u32>("jobs:all"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_prepared_before_clear_is_not_shared_or_cached() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let epoch = coordinator.epoch();
        coordinator.clear();
        assert_ne!(coordinator.epoch(), epoch);

        let stale = coordinator
            .cached_fetch_since(epoch, "jobs:all", move |_: &u32| ttl, counting_fetch(&calls, 1, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(stale, 1);
        assert_eq!(coordinator.in_flight_count(), 0);
        assert_eq!(coordinator.cache().get::<u32>("jobs:all"), None);

        let fresh = coordinator
            .cached_fetch("jobs:all", ttl, counting_fetch(&calls, 2, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(fresh, 2);
        assert_eq!(coordinator.cache().get::<u32>("jobs:all"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_prefix_marks_in_flight_uncacheable() {
        let coordinator = coordinator();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(30);

        let pending = coordinator.cached_fetch(
            "builds:jobA:20",
            ttl,
            counting_fetch(&calls, 1, Duration::from_secs(1)),
        );
        let invalidate_midway = async {
            sleep(Duration::from_millis(100)).await;
            coordinator.invalidate("builds:jobA:");
        };
        let (value, _) = tokio::join!(pending, invalidate_midway);

        assert_eq!(value.unwrap(), 1);
        assert_eq!(coordinator.cache().get::<u32>("builds:jobA:20"), None);

        let refetched = coordinator
            .cached_fetch("builds:jobA:20", ttl, counting_fetch(&calls, 2, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(refetched, 2);
        assert_eq!(coordinator.cache().get::<u32>("builds:jobA:20"), Some(2));
    }
}
