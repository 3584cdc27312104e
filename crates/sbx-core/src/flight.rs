//! Deduplicated creation of named entities
//!
//! [`SingleFlight`] pairs a name-keyed cache with the set of creations
//! currently in progress. The first caller to miss the cache for a key starts
//! the creation; every concurrent caller for that key awaits the same shared
//! future. A successful result is written to the cache before the future
//! resolves, so no waiter can observe the key as both uncached and idle.
//! Failures are handed to every waiter and are not cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use sbx_api::{ApiError, normalize_name};

type Flight<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A cache whose misses are filled at most once at a time per key
pub struct SingleFlight<T> {
    cache: Arc<Mutex<HashMap<String, T>>>,
    inflight: Mutex<HashMap<String, Flight<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a known value; blank keys are ignored
    pub fn seed(&self, key: &str, value: T) {
        let key = normalize_name(key);
        if key.is_empty() {
            return;
        }
        lock(&self.cache).insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<T> {
        lock(&self.cache).get(&normalize_name(key)).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.cache).contains_key(&normalize_name(key))
    }

    pub fn len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `create` once for everyone.
    ///
    /// `create` is only invoked when no value is cached and no other caller
    /// is already creating one for the same key.
    pub async fn get_or_create<F, Fut>(&self, key: &str, create: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let key = normalize_name(key);
        if let Some(value) = lock(&self.cache).get(&key) {
            return Ok(value.clone());
        }

        let flight = {
            let mut inflight = lock(&self.inflight);
            // A flight may have finished between the first check and taking the lock
            if let Some(value) = lock(&self.cache).get(&key) {
                return Ok(value.clone());
            }
            match inflight.get(&key) {
                Some(flight) => flight.clone(),
                None => {
                    let cache = Arc::clone(&self.cache);
                    let cache_key = key.clone();
                    let pending = create();
                    let flight = async move {
                        let value = pending.await?;
                        lock(&cache).insert(cache_key, value.clone());
                        Ok(value)
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key.clone(), flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        let mut inflight = lock(&self.inflight);
        if inflight.get(&key).is_some_and(|current| current.ptr_eq(&flight)) {
            inflight.remove(&key);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counted(
        calls: &Arc<AtomicUsize>,
        result: Result<u64, ApiError>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u64, ApiError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_creation() {
        let flight = SingleFlight::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let results = futures::future::join_all(
            (0..8).map(|i| {
                let key = if i % 2 == 0 { "Layout" } else { " layout " };
                flight.get_or_create(key, counted(&calls, Ok(42)))
            }),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| *r == Ok(42)));
        assert_eq!(flight.get("LAYOUT"), Some(42));
    }

    #[tokio::test]
    async fn test_seeded_value_skips_creation() {
        let flight = SingleFlight::<u64>::new();
        flight.seed("layout", 7);
        let calls = Arc::new(AtomicUsize::new(0));

        let value = flight.get_or_create("Layout", counted(&calls, Ok(42))).await;

        assert_eq!(value, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_shared_and_not_cached() {
        let flight = SingleFlight::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = ApiError::from_response(500, b"");

        let (a, b) = tokio::join!(
            flight.get_or_create("layout", counted(&calls, Err(failure.clone()))),
            flight.get_or_create("layout", counted(&calls, Err(failure.clone()))),
        );
        assert_eq!(a, Err(failure.clone()));
        assert_eq!(b, Err(failure));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flight.contains("layout"));

        let retried = flight.get_or_create("layout", counted(&calls, Ok(9))).await;
        assert_eq!(retried, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_blank_seed_ignored() {
        let flight = SingleFlight::<u64>::new();
        flight.seed("  ", 1);
        assert!(flight.is_empty());
    }
}
