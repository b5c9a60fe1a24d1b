//! Process-lifetime memoizing cache with in-flight request coalescing.
//!
//! Every metadata lookup (route, aircraft, photo, facts) goes through one of
//! these. Two contracts matter here:
//!
//! 1. Results are cached permanently, negative results included. The
//!    upstreams serve static reference data, so a key that resolved to "no
//!    data" once is never retried on later polls.
//! 2. Concurrent callers for the same uncached key run exactly one fetch and
//!    all receive its result. This is an atomic get-or-create of a shared
//!    future in the entry map; the pending entry is replaced by the settled
//!    value once the fetch completes.
//!
//! A fetch error is caught at this layer, logged, and cached as a negative
//! result. One failing upstream call never crashes the poll loop and never
//! turns into an unbounded retry.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::warn;

enum CacheEntry<V> {
    Ready(Option<V>),
    Pending(Shared<BoxFuture<'static, Option<V>>>),
}

pub struct EnrichmentCache<K, V> {
    /// Label for logs and metrics, e.g. "route".
    name: &'static str,
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> EnrichmentCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    ///
    /// `fetch` is only invoked when the key is neither cached nor already
    /// being fetched by another caller.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>> + Send + 'static,
    {
        let pending = match self.entries.entry(key.clone()) {
            MapEntry::Occupied(entry) => match entry.get() {
                CacheEntry::Ready(value) => {
                    metrics::counter!("enrichment.cache.hit", "cache" => self.name).increment(1);
                    return value.clone();
                }
                CacheEntry::Pending(shared) => {
                    metrics::counter!("enrichment.cache.coalesced", "cache" => self.name)
                        .increment(1);
                    shared.clone()
                }
            },
            MapEntry::Vacant(slot) => {
                metrics::counter!("enrichment.cache.miss", "cache" => self.name).increment(1);
                let name = self.name;
                let key_desc = format!("{:?}", key);
                let fut = fetch();
                let shared = async move {
                    match fut.await {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(
                                "{} lookup for {} failed, caching negative result: {:#}",
                                name, key_desc, err
                            );
                            None
                        }
                    }
                }
                .boxed()
                .shared();
                slot.insert(CacheEntry::Pending(shared.clone()));
                shared
            }
        };

        let value = pending.await;
        // Waiters may race to store the settled value; the writes are
        // identical so the order does not matter.
        self.entries.insert(key, CacheEntry::Ready(value.clone()));
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
