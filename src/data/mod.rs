//! Reddit data models and endpoint definitions
//!
//! This module contains the result types the listing endpoints produce and
//! the wire shapes they are decoded from. The endpoints themselves live in
//! [`posts`] and [`comments`].

pub mod comments;
pub mod posts;

pub use comments::{PostCommentsArgs, POST_COMMENTS};
pub use posts::{
    PopularPostsArgs, SearchPostsArgs, SubredditPostsArgs, Timeframe, POPULAR_POSTS, SEARCH_POSTS,
    SUBREDDIT_POSTS,
};

use serde::{Deserialize, Serialize};

/// Number of items requested when the caller does not say
pub const DEFAULT_LIMIT: u32 = 25;

/// A post from a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    /// Base-36 post id
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    /// Body text of self posts, empty for link posts
    #[serde(default)]
    pub selftext: String,
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    /// Link target (or the post itself for self posts)
    #[serde(default)]
    pub url: String,
    /// Path of the discussion page, e.g. "/r/rust/comments/abc/title/"
    #[serde(default)]
    pub permalink: Option<String>,
    /// Creation time as Unix seconds
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub thumbnail: String,
}

/// A comment with its nested replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    /// Creation time as Unix seconds
    pub created_utc: f64,
    pub replies: Vec<RedditComment>,
}

/// `{ "data": { "children": [...], "after": ... } }` envelope used by every listing
#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub(crate) data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    pub(crate) children: Vec<Thing<T>>,
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) after: Option<String>,
}

/// One child of a listing; `kind` is "t3" for posts, "t1" for comments, "more" for stubs
#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    #[serde(default)]
    pub(crate) kind: String,
    pub(crate) data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_deserializes_with_missing_optional_fields() {
        let post: RedditPost = serde_json::from_value(json!({
            "id": "1",
            "title": "Hello",
            "score": 10
        }))
        .expect("minimal post should decode");

        assert_eq!(post.id, "1");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.score, 10);
        assert!(post.permalink.is_none());
        assert_eq!(post.num_comments, 0);
    }

    #[test]
    fn test_post_requires_title() {
        let result = serde_json::from_value::<RedditPost>(json!({"id": "1", "score": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_listing_envelope() {
        let listing: Listing<RedditPost> = serde_json::from_value(json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t3", "data": {"id": "a", "title": "A", "score": 1}},
                    {"kind": "t3", "data": {"id": "b", "title": "B", "score": 2}}
                ],
                "after": "t3_b"
            }
        }))
        .expect("listing should decode");

        assert_eq!(listing.data.children.len(), 2);
        assert_eq!(listing.data.children[0].kind, "t3");
        assert_eq!(listing.data.children[1].data.id, "b");
        assert_eq!(listing.data.after.as_deref(), Some("t3_b"));
    }
}
