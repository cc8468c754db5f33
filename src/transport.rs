//! Transport boundary for the query cache
//!
//! A [`Transport`] performs exactly one network call for a fully resolved
//! [`RequestDescriptor`] and hands back the decoded JSON payload. The cache
//! never talks to the network any other way. [`HttpTransport`] is the real
//! implementation backed by reqwest.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;

/// Failure reported by a transport
///
/// `status` is set when the server answered with a non-success HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status code, if the server responded at all
    pub status: Option<u16>,
    /// Human-readable description of the failure
    pub message: String,
}

impl TransportError {
    /// Creates a failure that never reached an HTTP status (refused, timed out, ...)
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a failure for a non-success HTTP status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        Self {
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

/// Fully resolved input for one transport call
///
/// Built by an endpoint from its arguments and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Path relative to the transport's base URL (e.g. "/r/rust/top.json")
    pub path: String,
    /// Query parameters, unencoded
    pub query: Vec<(String, String)>,
    /// Extra headers for this request
    pub headers: Vec<(String, String)>,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Creates a GET request for the given path
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Performs a single network call for the cache
pub trait Transport: Send + Sync + 'static {
    /// Sends the request and resolves to the decoded JSON payload
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Result<Value, TransportError>>;
}

/// reqwest-backed transport
///
/// Every request carries the configured `User-Agent`; the Reddit API rejects
/// anonymous clients without one.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl HttpTransport {
    /// Creates a transport from the given configuration
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::from)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a transport around an existing reqwest client
    pub fn with_client(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Builds the reqwest request for a descriptor without sending it
    fn build(&self, request: &RequestDescriptor) -> Result<reqwest::Request, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.build().map_err(TransportError::from)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Result<Value, TransportError>> {
        let client = self.client.clone();
        let built = self.build(&request);

        async move {
            let built = built?;
            debug!(method = %built.method(), url = %built.url(), "sending request");

            let response = client.execute(built).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::http(
                    status.as_u16(),
                    format!("server responded with {}", status),
                ));
            }

            let text = response.text().await?;
            serde_json::from_str(&text)
                .map_err(|e| TransportError::network(format!("response was not valid JSON: {}", e)))
        }
        .boxed()
    }
}
