//! Keyed single-flight execution.
//!
//! Concurrent callers asking for the same key share one in-flight future
//! instead of each starting their own. The entry is removed as soon as the
//! leading caller finishes (or is dropped), so the next call after that
//! starts fresh.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type InFlight<V> = Shared<BoxFuture<'static, V>>;

/// Registry of in-flight work, one entry per key.
pub struct SingleFlight<K, V>
where
    V: Clone,
{
    in_flight: Mutex<HashMap<K, InFlight<V>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or join the run already in flight for it.
    ///
    /// `work` is only invoked by the caller that creates the entry.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (shared, _leader) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&key) {
                Some(existing) => (existing.clone(), None),
                None => {
                    let shared = work().boxed().shared();
                    in_flight.insert(key.clone(), shared.clone());
                    (
                        shared,
                        Some(LeaderGuard {
                            registry: &self.in_flight,
                            key,
                        }),
                    )
                }
            }
        };

        shared.await
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the leader's entry when the leader completes or is dropped.
///
/// Followers keep their clone of the shared future, so they still finish
/// even if the leader is cancelled.
struct LeaderGuard<'a, K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    registry: &'a Mutex<HashMap<K, InFlight<V>>>,
    key: K,
}

impl<K, V> Drop for LeaderGuard<'_, K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
