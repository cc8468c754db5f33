//! In-memory cache store
//!
//! Maps normalized keys to cache entries. Each entry lives inside a
//! `tokio::sync::watch` channel: mutations go through the channel's write
//! lock, so readers never see a partially written entry, and every
//! observable change wakes the entry's subscriptions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use super::entry::{CacheEntry, QueryStatus};
use super::key::CacheKey;

/// Process-lifetime table of cache entries
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<CacheKey, watch::Sender<CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the entry for `key`
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|slot| slot.borrow().clone())
    }

    /// Creates the entry if absent, applies `patch`, and returns a watcher
    ///
    /// `patch` returns whether the change is observable; `false` applies it
    /// without waking subscribers (used for subscriber bookkeeping).
    pub fn upsert<C, P>(&self, key: &CacheKey, create: C, patch: P) -> watch::Receiver<CacheEntry>
    where
        C: FnOnce() -> CacheEntry,
        P: FnOnce(&mut CacheEntry) -> bool,
    {
        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| watch::channel(create()).0);
        slot.send_if_modified(patch);
        slot.subscribe()
    }

    /// Applies `patch` to an existing entry; returns `false` if the key is absent
    pub fn update<P>(&self, key: &CacheKey, patch: P) -> bool
    where
        P: FnOnce(&mut CacheEntry) -> bool,
    {
        match self.entries.get(key) {
            Some(slot) => {
                slot.send_if_modified(patch);
                true
            }
            None => false,
        }
    }

    /// Removes an entry, returning its last state
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .remove(key)
            .map(|(_, slot)| slot.borrow().clone())
    }

    /// Removes every entry without subscribers that has been idle for at least `grace`
    ///
    /// Entries with a fetch in flight stay until it settles.
    pub fn evict_idle(&self, now: DateTime<Utc>, grace: Duration) -> Vec<CacheEntry> {
        let mut evicted = Vec::new();

        self.entries.retain(|_, slot| {
            let entry = slot.borrow();
            let expired = entry.subscriber_count == 0
                && entry.status != QueryStatus::Loading
                && entry
                    .idle_since
                    .and_then(|since| now.signed_duration_since(since).to_std().ok())
                    .is_some_and(|idle| idle >= grace);
            if expired {
                evicted.push(entry.clone());
            }
            !expired
        });

        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), remaining = self.entries.len(), "evicted idle cache entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|item| item.key().clone()).collect()
    }
}
