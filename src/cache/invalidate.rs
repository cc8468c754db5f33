//! Tag-based invalidation
//!
//! Invalidating a tag refetches every subscribed entry that carries it and
//! marks unsubscribed ones stale, so they refetch on their next `execute`
//! instead of spending a request on data nobody is looking at.

use std::collections::BTreeSet;

use tracing::debug;

use super::client::QueryClient;
use super::key::CacheKey;
use super::tags::Tag;

/// What an invalidation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Keys with subscribers that were moved to Loading and refetched
    pub refetched: Vec<CacheKey>,
    /// Keys without subscribers that were marked stale
    pub marked_stale: Vec<CacheKey>,
}

impl Invalidation {
    /// Total number of affected entries
    pub fn len(&self) -> usize {
        self.refetched.len() + self.marked_stale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refetched.is_empty() && self.marked_stale.is_empty()
    }
}

impl QueryClient {
    /// Invalidates every entry currently tagged with any of `tags`
    ///
    /// Tags match exactly: `Posts` does not reach an entry tagged
    /// `Posts:rust`. Use [`invalidate_kind`](Self::invalidate_kind) for that.
    /// A subscribed entry with a fetch already in flight gets a new fetch; the
    /// older one is aborted and its result discarded.
    pub fn invalidate(&self, tags: &[Tag]) -> Invalidation {
        let keys: BTreeSet<CacheKey> = tags
            .iter()
            .flat_map(|tag| self.inner.tags.keys_for(tag))
            .collect();

        let mut report = Invalidation::default();
        for key in keys {
            let mut pending = None;
            let mut stale = false;
            self.inner.store.update(&key, |entry| {
                if !tags.iter().any(|tag| entry.tags.contains(tag)) {
                    return false;
                }
                if entry.subscriber_count > 0 {
                    pending = Some(entry.begin_fetch(self.next_fetch_id()));
                } else {
                    entry.is_stale = true;
                    stale = true;
                }
                true
            });

            if let Some(fetch) = pending {
                self.spawn_fetch(key.clone(), fetch);
                report.refetched.push(key);
            } else if stale {
                report.marked_stale.push(key);
            }
        }

        debug!(
            tags = ?tags.iter().map(Tag::to_string).collect::<Vec<_>>(),
            refetched = report.refetched.len(),
            marked_stale = report.marked_stale.len(),
            "invalidated tags"
        );
        report
    }

    /// Invalidates every tag of the given kind, with or without an id
    pub fn invalidate_kind(&self, kind: &str) -> Invalidation {
        let tags = self.inner.tags.tags_of_kind(kind);
        self.invalidate(&tags)
    }
}
