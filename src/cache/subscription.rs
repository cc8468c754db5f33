//! Consumer-facing subscription handles and result snapshots

use std::future::Future;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::client::QueryClient;
use super::entry::{CacheEntry, QueryStatus};
use super::error::QueryError;
use super::key::CacheKey;

/// Snapshot of a query as seen by one subscriber
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    /// Lifecycle state of the underlying entry
    pub status: QueryStatus,
    /// Latest successful result; kept while a refetch is in flight or after a failed one
    pub data: Option<T>,
    /// Failure of the latest fetch, if it failed
    pub error: Option<QueryError>,
    /// Whether the entry was invalidated and awaits a refetch
    pub is_stale: bool,
    /// When the data was last written by a successful fetch
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl<T: Clone + 'static> QueryResult<T> {
    pub(crate) fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            data: entry.data::<T>(),
            error: entry.error.clone(),
            is_stale: entry.is_stale,
            last_fetched_at: entry.last_fetched_at,
        }
    }
}

impl<T> QueryResult<T> {
    /// Returns the data if any fetch has succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub const fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Returns `true` if nothing has been fetched for this key yet.
    pub fn is_uninitialized(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    /// Returns `true` if the first fetch is in flight and there is no data yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading && self.data.is_none()
    }

    /// Returns `true` if any fetch is in flight, including refetches.
    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Returns `true` if the latest fetch succeeded.
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Returns `true` if the latest fetch failed.
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Returns `true` if the result is settled (success or error).
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Success | QueryStatus::Error)
    }
}

impl<T> QueryResult<Vec<T>> {
    /// Returns `true` if the latest fetch succeeded with zero items.
    ///
    /// An empty listing is a valid result, not an error.
    pub fn is_empty(&self) -> bool {
        self.is_success() && self.data.as_ref().is_some_and(Vec::is_empty)
    }
}

/// Live handle on one cache entry
///
/// Holding a subscription keeps the entry's subscriber count raised, which
/// protects it from eviction and makes tag invalidation refetch it eagerly.
/// Dropping the handle (or calling [`release`](Self::release)) gives that up;
/// the cached data stays until the next eviction pass.
pub struct Subscription<T> {
    key: CacheKey,
    rx: watch::Receiver<CacheEntry>,
    client: QueryClient,
    _result: PhantomData<fn() -> T>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(key: CacheKey, rx: watch::Receiver<CacheEntry>, client: QueryClient) -> Self {
        Self {
            key,
            rx,
            client,
            _result: PhantomData,
        }
    }

    /// Key of the entry this subscription observes
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current state of the entry
    pub fn state(&self) -> QueryResult<T> {
        QueryResult::from_entry(&self.rx.borrow())
    }

    /// Waits for the next observable change and returns the new state
    ///
    /// Returns `None` if the entry no longer exists.
    pub async fn changed(&mut self) -> Option<QueryResult<T>> {
        self.rx.changed().await.ok()?;
        Some(QueryResult::from_entry(&self.rx.borrow_and_update()))
    }

    /// Waits until the entry holds a settled result (success or error)
    ///
    /// Returns immediately if it already does. Never resolves for an Idle
    /// entry that nobody fetches.
    pub async fn settled(&mut self) -> QueryResult<T> {
        loop {
            let state = QueryResult::from_entry(&self.rx.borrow_and_update());
            if state.is_settled() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// [`settled`](Self::settled), abandoned as soon as `cancel` completes
    ///
    /// Returns `None` if `cancel` won. The fetch itself keeps running.
    pub async fn settled_until<F>(&mut self, cancel: F) -> Option<QueryResult<T>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.settled() => Some(result),
            _ = cancel => None,
        }
    }

    /// Refetches the entry unless a fetch is already in flight
    ///
    /// Returns `true` if a new fetch was started.
    pub fn refetch(&self) -> bool {
        self.client.refetch(&self.key)
    }

    /// Gives up this subscription
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.client.release(&self.key);
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}
