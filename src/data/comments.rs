//! Comment thread endpoint
//!
//! The comments payload is a two-element array: the post listing, then the
//! comment listing. Replies nest as further listings, or as an empty string
//! when a comment has none. "more" stubs are skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Listing, RedditComment};
use crate::cache::{Endpoint, QueryError, Tag};
use crate::transport::RequestDescriptor;

/// Tag kind provided by comment threads
pub const COMMENTS_TAG: &str = "Comments";

/// Arguments for [`POST_COMMENTS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostCommentsArgs {
    pub subreddit: String,
    pub post_id: String,
}

impl PostCommentsArgs {
    pub fn new(subreddit: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            subreddit: subreddit.into(),
            post_id: post_id.into(),
        }
    }
}

/// Top-level comments of one post with their replies, tagged `Comments:<post id>`
pub const POST_COMMENTS: Endpoint<PostCommentsArgs, Vec<RedditComment>> = Endpoint {
    name: "getPostComments",
    build_request: comments_request,
    transform: comments_from_thread,
    provides_tags: comments_tags,
};

/// Comment as it appears on the wire, before replies are unwrapped
#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    replies: Value,
}

fn comments_request(args: &PostCommentsArgs) -> RequestDescriptor {
    RequestDescriptor::get(format!("/r/{}/comments/{}.json", args.subreddit, args.post_id))
}

fn comments_tags(args: &PostCommentsArgs) -> Vec<Tag> {
    vec![Tag::with_id(COMMENTS_TAG, args.post_id.clone())]
}

/// Extracts the comment tree from a `[post, comments]` payload
pub fn comments_from_thread(payload: Value) -> Result<Vec<RedditComment>, QueryError> {
    let Value::Array(mut parts) = payload else {
        return Err(QueryError::Decode(
            "expected a [post, comments] array".to_string(),
        ));
    };
    if parts.len() < 2 {
        return Ok(Vec::new());
    }
    comments_from_listing(parts.swap_remove(1))
}

fn comments_from_listing(listing: Value) -> Result<Vec<RedditComment>, QueryError> {
    let listing: Listing<Value> = serde_json::from_value(listing).map_err(QueryError::decode)?;

    listing
        .data
        .children
        .into_iter()
        .filter(|child| child.kind == "t1")
        .map(|child| -> Result<RedditComment, QueryError> {
            let raw: RawComment = serde_json::from_value(child.data).map_err(QueryError::decode)?;
            let replies = match raw.replies {
                Value::Object(_) => comments_from_listing(raw.replies)?,
                _ => Vec::new(),
            };
            Ok(RedditComment {
                id: raw.id,
                author: raw.author,
                body: raw.body,
                score: raw.score,
                created_utc: raw.created_utc,
                replies,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(id: &str, body: &str, replies: Value) -> Value {
        json!({
            "kind": "t1",
            "data": {
                "id": id,
                "author": "ferris",
                "body": body,
                "score": 3,
                "created_utc": 1700000000.0,
                "replies": replies
            }
        })
    }

    fn listing(children: Vec<Value>) -> Value {
        json!({"kind": "Listing", "data": {"children": children, "after": null}})
    }

    #[test]
    fn test_comments_request_and_tags() {
        let args = PostCommentsArgs::new("rust", "abc123");
        let request = (POST_COMMENTS.build_request)(&args);
        assert_eq!(request.path, "/r/rust/comments/abc123.json");
        assert_eq!(
            (POST_COMMENTS.provides_tags)(&args),
            vec![Tag::with_id("Comments", "abc123")]
        );
    }

    #[test]
    fn test_nested_replies_are_unwrapped() {
        let reply = comment("c2", "agreed", json!(""));
        let payload = json!([
            listing(vec![json!({"kind": "t3", "data": {"id": "p1"}})]),
            listing(vec![
                comment("c1", "first!", listing(vec![reply])),
                json!({"kind": "more", "data": {"count": 12, "children": ["c9"]}}),
            ]),
        ]);

        let comments = comments_from_thread(payload).expect("thread should decode");

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].body, "first!");
        assert_eq!(comments[0].replies.len(), 1);
        assert_eq!(comments[0].replies[0].id, "c2");
        assert!(comments[0].replies[0].replies.is_empty());
    }

    #[test]
    fn test_missing_comment_listing_is_empty() {
        let payload = json!([listing(vec![])]);
        assert!(comments_from_thread(payload).unwrap().is_empty());
    }

    #[test]
    fn test_non_array_payload_is_decode_error() {
        let err = comments_from_thread(json!({"data": {}})).unwrap_err();
        assert!(matches!(err, QueryError::Decode(_)));
    }

    #[test]
    fn test_malformed_comment_is_decode_error() {
        let payload = json!([
            listing(vec![]),
            listing(vec![json!({"kind": "t1", "data": {"body": "no id"}})]),
        ]);
        assert!(matches!(
            comments_from_thread(payload),
            Err(QueryError::Decode(_))
        ));
    }
}
