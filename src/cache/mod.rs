//! Query cache for remote listings
//!
//! This module mediates between consumers and the remote API. It deduplicates
//! in-flight requests, caches transformed responses under normalized keys,
//! tracks each query's Idle/Loading/Success/Error lifecycle, and invalidates
//! entries by tag.
//!
//! The entry point is [`QueryClient`]; applications describe their queries
//! as [`Endpoint`] constants and observe results through [`Subscription`]s.

mod client;
mod endpoint;
mod entry;
mod error;
mod invalidate;
mod key;
mod store;
mod subscription;
mod tags;

pub use client::{QueryClient, QueryOptions};
pub use endpoint::Endpoint;
pub use entry::{CacheEntry, QueryStatus};
pub use error::{CacheError, QueryError};
pub use invalidate::Invalidation;
pub use key::CacheKey;
pub use store::CacheStore;
pub use subscription::{QueryResult, Subscription};
pub use tags::{Tag, TagIndex};
