//! Configuration for the query cache and its HTTP transport

use std::time::Duration;

/// Base URL of the public Reddit listing API
pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Identifying header value sent with every request
pub const DEFAULT_USER_AGENT: &str = "RedditApp/1.0";

/// Configuration for cache eviction
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept before it may be evicted
    pub keep_unused_for: Duration,
    /// Interval between background eviction passes
    pub gc_interval: Duration,
    /// Whether the background eviction sweeper runs at all
    pub gc_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::ZERO,     // evict on the next pass
            gc_interval: Duration::from_secs(60), // 1 minute
            gc_enabled: true,
        }
    }
}

/// Configuration for [`HttpTransport`](crate::transport::HttpTransport)
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Scheme and host requests are resolved against
    pub base_url: String,
    /// Value of the `User-Agent` header attached to every request
    pub user_agent: String,
    /// Per-request timeout; expiry surfaces as a network error
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
