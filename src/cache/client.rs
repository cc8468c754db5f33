//! Query executor
//!
//! [`QueryClient`] is the one object the host application creates and passes
//! around. It owns the cache store, the tag index, and the injected
//! transport, and it is the only thing that mutates cache entries.
//!
//! # Design Pattern: Dedup by key, last fetch wins
//!
//! 1. `execute` normalizes (endpoint, args) into a [`CacheKey`]
//! 2. If the entry is Loading, or Success and not stale, the caller attaches to it
//! 3. Otherwise the entry moves to Loading and a fetch is spawned
//! 4. The fetch result is written back only if no newer fetch was started
//!    for the same key in the meantime
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use redquery::cache::QueryClient;
//! use redquery::config::{CacheConfig, HttpConfig};
//! use redquery::data::posts::{SubredditPostsArgs, SUBREDDIT_POSTS};
//! use redquery::transport::HttpTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(&HttpConfig::default())?;
//! let client = QueryClient::new(Arc::new(transport), CacheConfig::default());
//!
//! let mut posts = client.execute(&SUBREDDIT_POSTS, &SubredditPostsArgs::new("rust"))?;
//! let result = posts.settled().await;
//! for post in result.data().into_iter().flatten() {
//!     println!("{} ({})", post.title, post.score);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::endpoint::Endpoint;
use super::entry::{AnyData, CacheEntry, FetchPlan, PendingFetch, QueryStatus};
use super::error::{CacheError, QueryError};
use super::key::CacheKey;
use super::store::CacheStore;
use super::subscription::Subscription;
use super::tags::TagIndex;
use crate::config::CacheConfig;
use crate::transport::Transport;

/// Per-call options for [`QueryClient::execute_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Refetch even if a fresh result is cached; never starts a second
    /// fetch while one is in flight
    pub force_refetch: bool,
}

/// Central cache instance shared by every consumer
///
/// Cheap to clone; clones share the same store. All fetches are spawned on
/// the ambient Tokio runtime, so the methods that may start one must be
/// called from within a runtime.
#[derive(Clone)]
pub struct QueryClient {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) store: CacheStore,
    pub(crate) tags: TagIndex,
    transport: Arc<dyn Transport>,
    config: CacheConfig,
    in_flight: DashMap<CacheKey, (u64, AbortHandle)>,
    next_fetch_id: AtomicU64,
}

impl QueryClient {
    /// Creates a client around the given transport
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: CacheStore::new(),
                tags: TagIndex::new(),
                transport,
                config,
                in_flight: DashMap::new(),
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Subscribes to a query, fetching it unless a usable result or fetch exists
    ///
    /// Returns immediately; the handle observes the fetch as it progresses.
    pub fn execute<A, T>(&self, endpoint: &Endpoint<A, T>, args: &A) -> Result<Subscription<T>, CacheError>
    where
        A: Serialize,
        T: Clone + Send + Sync + 'static,
    {
        self.execute_with(endpoint, args, QueryOptions::default())
    }

    /// [`execute`](Self::execute) with explicit options
    pub fn execute_with<A, T>(
        &self,
        endpoint: &Endpoint<A, T>,
        args: &A,
        options: QueryOptions,
    ) -> Result<Subscription<T>, CacheError>
    where
        A: Serialize,
        T: Clone + Send + Sync + 'static,
    {
        let key = CacheKey::new(endpoint.name, args)?;
        let mut pending = None;

        let rx = self.inner.store.upsert(
            &key,
            || CacheEntry::new(key.clone(), Arc::new(FetchPlan::new(endpoint, args))),
            |entry| {
                entry.acquire();
                let in_flight = entry.status == QueryStatus::Loading;
                if in_flight || (entry.is_reusable() && !options.force_refetch) {
                    return false;
                }
                pending = Some(entry.begin_fetch(self.next_fetch_id()));
                true
            },
        );

        match pending {
            Some(fetch) => self.spawn_fetch(key.clone(), fetch),
            None => debug!(%key, "attached to cached entry"),
        }
        Ok(Subscription::new(key, rx, self.clone()))
    }

    /// Subscribes to a query without fetching it
    ///
    /// Creates an Idle entry if the key is unknown. A later
    /// [`execute`](Self::execute) or [`Subscription::refetch`] drives the fetch.
    pub fn subscribe<A, T>(&self, endpoint: &Endpoint<A, T>, args: &A) -> Result<Subscription<T>, CacheError>
    where
        A: Serialize,
        T: Clone + Send + Sync + 'static,
    {
        let key = CacheKey::new(endpoint.name, args)?;
        let rx = self.inner.store.upsert(
            &key,
            || CacheEntry::new(key.clone(), Arc::new(FetchPlan::new(endpoint, args))),
            |entry| {
                entry.acquire();
                false
            },
        );
        Ok(Subscription::new(key, rx, self.clone()))
    }

    /// Refetches the entry for `key` unless a fetch is already in flight
    ///
    /// Returns `true` if a fetch was started.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let mut pending = None;
        self.inner.store.update(key, |entry| {
            if entry.status == QueryStatus::Loading {
                return false;
            }
            pending = Some(entry.begin_fetch(self.next_fetch_id()));
            true
        });

        match pending {
            Some(fetch) => {
                self.spawn_fetch(key.clone(), fetch);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the entry for `key`, if cached
    pub fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.store.get(key)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Evicts entries that have had no subscribers for the configured grace period
    ///
    /// Returns the number of evicted entries. An entry whose fetch is still in
    /// flight is kept until that fetch settles; releasing a subscription never
    /// cancels a network call.
    pub fn collect_garbage(&self) -> usize {
        let evicted = self
            .inner
            .store
            .evict_idle(Utc::now(), self.inner.config.keep_unused_for);

        for entry in &evicted {
            self.inner.tags.dissociate(&entry.key, &entry.tags);
            self.inner.tags.dissociate(&entry.key, &entry.plan.tags);
            self.inner
                .in_flight
                .remove_if(&entry.key, |_, (_, handle)| handle.is_finished());
        }
        evicted.len()
    }

    pub(crate) fn release(&self, key: &CacheKey) {
        let now = Utc::now();
        self.inner.store.update(key, |entry| {
            entry.release(now);
            false
        });
    }

    pub(crate) fn next_fetch_id(&self) -> u64 {
        self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs the transport call for a fetch started by `begin_fetch`
    pub(crate) fn spawn_fetch(&self, key: CacheKey, fetch: PendingFetch) {
        let PendingFetch { fetch_id, plan } = fetch;
        debug!(%key, fetch_id, path = %plan.request.path, "starting fetch");

        let client = self.clone();
        let transport = Arc::clone(&self.inner.transport);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = match transport.send(plan.request.clone()).await {
                Ok(payload) => (plan.decode)(payload),
                Err(err) => Err(QueryError::from(err)),
            };
            client.settle(&task_key, fetch_id, &plan, outcome);
        });

        self.track_in_flight(key, fetch_id, task.abort_handle());
    }

    /// Records the running fetch for `key`, aborting whichever of the old and
    /// new fetch is older
    fn track_in_flight(&self, key: CacheKey, fetch_id: u64, handle: AbortHandle) {
        match self.inner.in_flight.entry(key) {
            Entry::Occupied(mut slot) => {
                if slot.get().0 < fetch_id {
                    let (superseded, previous) = slot.insert((fetch_id, handle));
                    debug!(key = %slot.key(), superseded, fetch_id, "aborting superseded fetch");
                    previous.abort();
                } else {
                    handle.abort();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert((fetch_id, handle));
            }
        }
    }

    /// Writes a fetch outcome back unless a newer fetch has started since
    fn settle(&self, key: &CacheKey, fetch_id: u64, plan: &FetchPlan, outcome: Result<AnyData, QueryError>) {
        self.inner.in_flight.remove_if(key, |_, (id, _)| *id == fetch_id);

        if let Err(err) = &outcome {
            warn!(%key, fetch_id, error = %err, "fetch failed");
        }

        // New associations go in before the entry is written so the index
        // never misses a tag the entry already carries.
        let succeeded = outcome.is_ok();
        if succeeded {
            self.inner.tags.associate(key, &plan.tags);
        }

        let mut applied = false;
        let mut previous_tags = None;
        let now = Utc::now();
        self.inner.store.update(key, |entry| {
            if entry.fetch_id != fetch_id {
                return false;
            }
            applied = true;
            previous_tags = entry.complete(outcome, now);
            true
        });

        if !applied {
            debug!(%key, fetch_id, "discarded result of superseded fetch");
            if succeeded {
                self.forget_orphaned_tags(key, plan);
            }
            return;
        }
        if let Some(previous) = previous_tags {
            let stale: Vec<_> = previous.difference(&plan.tags).collect();
            self.inner.tags.dissociate(key, stale);
        }
    }

    /// Drops the associations a discarded fetch added for a key that no longer has an entry
    fn forget_orphaned_tags(&self, key: &CacheKey, plan: &FetchPlan) {
        if self.inner.store.get(key).is_some() {
            return;
        }
        self.inner.tags.dissociate(key, &plan.tags);

        // The key may have been re-created while the associations were dropped
        if let Some(entry) = self.inner.store.get(key) {
            self.inner.tags.associate(key, &entry.plan.tags);
        }
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.inner.store.len())
            .field("tags", &self.inner.tags.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
