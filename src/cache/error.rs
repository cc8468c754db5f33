use thiserror::Error;

use crate::transport::TransportError;

/// Failure stored on a cache entry
///
/// Never returned across the consumer boundary; consumers read it from
/// [`QueryResult::error`](super::QueryResult::error) and decide whether to refetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The transport call failed (refused, timed out, non-success status)
    #[error("Network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// The payload did not have the shape the endpoint expects
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl QueryError {
    /// Wraps a deserialization failure from an endpoint transform
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// HTTP status of a network failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            Self::Decode(_) => None,
        }
    }
}

impl From<TransportError> for QueryError {
    fn from(err: TransportError) -> Self {
        Self::Network {
            status: err.status,
            message: err.message,
        }
    }
}

/// Error returned synchronously by cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Query arguments could not be turned into a cache key
    #[error("Query arguments could not be serialized: {0}")]
    InvalidArgs(#[from] serde_json::Error),
}
