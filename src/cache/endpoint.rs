use std::fmt;

use serde_json::Value;

use super::error::QueryError;
use super::tags::Tag;
use crate::transport::RequestDescriptor;

/// Definition of one logical query type
///
/// Plain data: an identity plus three pure functions. Applications declare
/// endpoints as `const`s and hand them to
/// [`QueryClient::execute`](super::QueryClient::execute).
///
/// ```
/// use redquery::cache::{Endpoint, QueryError, Tag};
/// use redquery::transport::RequestDescriptor;
///
/// fn request(user: &String) -> RequestDescriptor {
///     RequestDescriptor::get(format!("/user/{}/about.json", user))
/// }
///
/// fn karma(payload: serde_json::Value) -> Result<i64, QueryError> {
///     payload["data"]["total_karma"]
///         .as_i64()
///         .ok_or_else(|| QueryError::Decode("missing total_karma".to_string()))
/// }
///
/// fn tags(user: &String) -> Vec<Tag> {
///     vec![Tag::with_id("User", user.clone())]
/// }
///
/// const USER_KARMA: Endpoint<String, i64> = Endpoint {
///     name: "getUserKarma",
///     build_request: request,
///     transform: karma,
///     provides_tags: tags,
/// };
/// # assert_eq!(USER_KARMA.name, "getUserKarma");
/// ```
pub struct Endpoint<A, T> {
    /// Identity of the query type; part of every cache key
    pub name: &'static str,
    /// Resolves arguments into a transport request
    pub build_request: fn(&A) -> RequestDescriptor,
    /// Turns the raw payload into the result value
    pub transform: fn(Value) -> Result<T, QueryError>,
    /// Tags a successful result provides
    pub provides_tags: fn(&A) -> Vec<Tag>,
}

impl<A, T> Clone for Endpoint<A, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, T> Copy for Endpoint<A, T> {}

impl<A, T> fmt::Debug for Endpoint<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("name", &self.name).finish()
    }
}
