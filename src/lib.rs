//! redquery library
//!
//! A client-side query cache for public Reddit listings: request
//! deduplication, normalized cache keys, query lifecycle tracking and
//! tag-based invalidation. The `redquery` binary is a thin host on top.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod gc;
pub mod render;
pub mod transport;
