//! Cache entries and their lifecycle

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::endpoint::Endpoint;
use super::error::QueryError;
use super::key::CacheKey;
use super::tags::Tag;
use crate::transport::RequestDescriptor;

/// Type-erased transformed result stored in an entry
pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

type Decoder = Arc<dyn Fn(Value) -> Result<AnyData, QueryError> + Send + Sync>;

/// Lifecycle state of a cache entry
///
/// Moves Idle → Loading → Success | Error, and back to Loading on refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryStatus {
    /// Registered but never fetched
    Idle,
    /// A fetch is in flight
    Loading,
    /// The latest fetch succeeded
    Success,
    /// The latest fetch failed
    Error,
}

/// Everything needed to (re)run the fetch for one key
///
/// Captured once when the key is first seen; invalidation-triggered refetches
/// reuse it without going back to the caller.
pub(crate) struct FetchPlan {
    pub(crate) request: RequestDescriptor,
    pub(crate) decode: Decoder,
    pub(crate) tags: HashSet<Tag>,
}

impl FetchPlan {
    pub(crate) fn new<A, T>(endpoint: &Endpoint<A, T>, args: &A) -> Self
    where
        T: Send + Sync + 'static,
    {
        let transform = endpoint.transform;
        Self {
            request: (endpoint.build_request)(args),
            decode: Arc::new(move |payload| transform(payload).map(|data| Arc::new(data) as AnyData)),
            tags: (endpoint.provides_tags)(args).into_iter().collect(),
        }
    }
}

/// One cached query
///
/// Owned by the [`CacheStore`](super::CacheStore); everything outside the
/// store only sees clones.
#[derive(Clone)]
pub struct CacheEntry {
    pub(crate) key: CacheKey,
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<AnyData>,
    pub(crate) error: Option<QueryError>,
    pub(crate) tags: HashSet<Tag>,
    pub(crate) subscriber_count: usize,
    pub(crate) last_fetched_at: Option<DateTime<Utc>>,
    pub(crate) is_stale: bool,
    /// Id of the most recently started fetch; results from older fetches are dropped
    pub(crate) fetch_id: u64,
    /// When the subscriber count last dropped to zero
    pub(crate) idle_since: Option<DateTime<Utc>>,
    pub(crate) plan: Arc<FetchPlan>,
}

impl CacheEntry {
    pub(crate) fn new(key: CacheKey, plan: Arc<FetchPlan>) -> Self {
        Self {
            key,
            status: QueryStatus::Idle,
            data: None,
            error: None,
            tags: HashSet::new(),
            subscriber_count: 0,
            last_fetched_at: None,
            is_stale: false,
            fetch_id: 0,
            idle_since: Some(Utc::now()),
            plan,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Tags provided by the latest successful fetch
    pub fn tags(&self) -> &HashSet<Tag> {
        &self.tags
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count
    }

    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetched_at
    }

    /// Whether the entry was invalidated while nobody was subscribed
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The stored result, if it exists and has type `T`
    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|data| (**data).downcast_ref::<T>())
            .cloned()
    }

    /// Whether a new subscriber can attach to this entry without fetching
    pub(crate) fn is_reusable(&self) -> bool {
        match self.status {
            QueryStatus::Loading => true,
            QueryStatus::Success => !self.is_stale,
            QueryStatus::Idle | QueryStatus::Error => false,
        }
    }

    pub(crate) fn acquire(&mut self) {
        self.subscriber_count += 1;
        self.idle_since = None;
    }

    pub(crate) fn release(&mut self, now: DateTime<Utc>) {
        self.subscriber_count = self.subscriber_count.saturating_sub(1);
        if self.subscriber_count == 0 {
            self.idle_since = Some(now);
        }
    }

    /// Moves the entry to Loading under a new fetch id and returns what to run
    pub(crate) fn begin_fetch(&mut self, fetch_id: u64) -> PendingFetch {
        self.status = QueryStatus::Loading;
        self.is_stale = false;
        self.fetch_id = fetch_id;
        PendingFetch {
            fetch_id,
            plan: Arc::clone(&self.plan),
        }
    }

    /// Applies a fetch outcome, returning the previous tags on success
    pub(crate) fn complete(
        &mut self,
        outcome: Result<AnyData, QueryError>,
        now: DateTime<Utc>,
    ) -> Option<HashSet<Tag>> {
        match outcome {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = Some(data);
                self.error = None;
                self.last_fetched_at = Some(now);
                Some(std::mem::replace(&mut self.tags, self.plan.tags.clone()))
            }
            Err(err) => {
                self.status = QueryStatus::Error;
                self.error = Some(err);
                None
            }
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("tags", &self.tags)
            .field("subscriber_count", &self.subscriber_count)
            .field("last_fetched_at", &self.last_fetched_at)
            .field("is_stale", &self.is_stale)
            .field("fetch_id", &self.fetch_id)
            .finish_non_exhaustive()
    }
}

/// A fetch that was started by [`CacheEntry::begin_fetch`] and still has to be spawned
pub(crate) struct PendingFetch {
    pub(crate) fetch_id: u64,
    pub(crate) plan: Arc<FetchPlan>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(payload: Value) -> Result<Vec<u32>, QueryError> {
        serde_json::from_value(payload).map_err(QueryError::decode)
    }

    fn request(_: &()) -> RequestDescriptor {
        RequestDescriptor::get("/numbers.json")
    }

    fn tags(_: &()) -> Vec<Tag> {
        vec![Tag::new("Numbers")]
    }

    const NUMBERS: Endpoint<(), Vec<u32>> = Endpoint {
        name: "numbers",
        build_request: request,
        transform: numbers,
        provides_tags: tags,
    };

    fn entry() -> CacheEntry {
        let key = CacheKey::new(NUMBERS.name, &()).unwrap();
        CacheEntry::new(key, Arc::new(FetchPlan::new(&NUMBERS, &())))
    }

    #[test]
    fn test_new_entry_is_idle() {
        let entry = entry();
        assert_eq!(entry.status(), QueryStatus::Idle);
        assert!(!entry.has_data());
        assert!(entry.tags().is_empty());
        assert_eq!(entry.subscriber_count(), 0);
        assert!(entry.last_fetched_at().is_none());
        assert!(!entry.is_reusable());
    }

    #[test]
    fn test_plan_captures_request_and_tags() {
        let entry = entry();
        assert_eq!(entry.plan.request.path, "/numbers.json");
        assert!(entry.plan.tags.contains(&Tag::new("Numbers")));
    }

    #[test]
    fn test_begin_fetch_moves_to_loading() {
        let mut entry = entry();
        entry.is_stale = true;

        let pending = entry.begin_fetch(7);

        assert_eq!(pending.fetch_id, 7);
        assert_eq!(entry.fetch_id, 7);
        assert_eq!(entry.status(), QueryStatus::Loading);
        assert!(!entry.is_stale());
        assert!(entry.is_reusable());
    }

    #[test]
    fn test_complete_success_stores_data_and_tags() {
        let mut entry = entry();
        let pending = entry.begin_fetch(1);
        let decoded = (pending.plan.decode)(json!([1, 2, 3]));

        let previous = entry.complete(decoded, Utc::now());

        assert_eq!(previous, Some(HashSet::new()));
        assert_eq!(entry.status(), QueryStatus::Success);
        assert_eq!(entry.data::<Vec<u32>>(), Some(vec![1, 2, 3]));
        assert!(entry.data::<String>().is_none());
        assert!(entry.tags().contains(&Tag::new("Numbers")));
        assert!(entry.last_fetched_at().is_some());
    }

    #[test]
    fn test_complete_error_keeps_previous_data() {
        let mut entry = entry();
        entry.begin_fetch(1);
        let decoded = (entry.plan.decode)(json!([4]));
        entry.complete(decoded, Utc::now());

        entry.begin_fetch(2);
        let decoded = (entry.plan.decode)(json!({"not": "a list"}));
        let previous = entry.complete(decoded, Utc::now());

        assert!(previous.is_none());
        assert_eq!(entry.status(), QueryStatus::Error);
        assert!(matches!(entry.error(), Some(QueryError::Decode(_))));
        assert_eq!(entry.data::<Vec<u32>>(), Some(vec![4]));
        assert!(!entry.is_reusable());
    }

    #[test]
    fn test_acquire_and_release() {
        let mut entry = entry();
        entry.acquire();
        entry.acquire();
        assert_eq!(entry.subscriber_count(), 2);
        assert!(entry.idle_since.is_none());

        entry.release(Utc::now());
        assert!(entry.idle_since.is_none());
        entry.release(Utc::now());
        assert_eq!(entry.subscriber_count(), 0);
        assert!(entry.idle_since.is_some());

        entry.release(Utc::now());
        assert_eq!(entry.subscriber_count(), 0);
    }

    #[test]
    fn test_stale_success_is_not_reusable() {
        let mut entry = entry();
        entry.begin_fetch(1);
        let decoded = (entry.plan.decode)(json!([]));
        entry.complete(decoded, Utc::now());
        assert!(entry.is_reusable());

        entry.is_stale = true;
        assert!(!entry.is_reusable());
    }
}
