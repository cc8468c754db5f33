//! Post listing endpoints
//!
//! Top posts of a subreddit, top posts of r/popular, and search. All three
//! decode the same listing envelope into `Vec<RedditPost>`.

use serde::Serialize;
use serde_json::Value;

use super::{Listing, RedditPost, DEFAULT_LIMIT};
use crate::cache::{Endpoint, QueryError, Tag};
use crate::transport::RequestDescriptor;

/// Tag kind provided by every post listing
pub const POSTS_TAG: &str = "Posts";

/// Time window for "top" listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Timeframe {
    /// Value of the `t` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
            Timeframe::All => "all",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Hour => "Past Hour",
            Timeframe::Day => "Today",
            Timeframe::Week => "This Week",
            Timeframe::Month => "This Month",
            Timeframe::Year => "This Year",
            Timeframe::All => "All Time",
        }
    }

    /// Parses a timeframe name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hour" => Some(Timeframe::Hour),
            "day" | "today" => Some(Timeframe::Day),
            "week" => Some(Timeframe::Week),
            "month" => Some(Timeframe::Month),
            "year" => Some(Timeframe::Year),
            "all" => Some(Timeframe::All),
            _ => None,
        }
    }
}

/// Arguments for [`SUBREDDIT_POSTS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubredditPostsArgs {
    pub subreddit: String,
    pub limit: Option<u32>,
    pub timeframe: Option<Timeframe>,
}

impl SubredditPostsArgs {
    pub fn new(subreddit: impl Into<String>) -> Self {
        Self {
            subreddit: subreddit.into(),
            limit: None,
            timeframe: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }
}

/// Arguments for [`POPULAR_POSTS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopularPostsArgs {
    pub limit: Option<u32>,
    pub timeframe: Option<Timeframe>,
}

/// Arguments for [`SEARCH_POSTS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPostsArgs {
    pub query: String,
    /// Subreddit to search in; all of Reddit when `None`
    pub subreddit: Option<String>,
    pub limit: Option<u32>,
}

impl SearchPostsArgs {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            subreddit: None,
            limit: None,
        }
    }
}

/// Top posts of one subreddit, tagged `Posts:<subreddit>`
pub const SUBREDDIT_POSTS: Endpoint<SubredditPostsArgs, Vec<RedditPost>> = Endpoint {
    name: "getSubredditPosts",
    build_request: subreddit_request,
    transform: posts_from_listing,
    provides_tags: subreddit_tags,
};

/// Top posts of r/popular, tagged `Posts`
pub const POPULAR_POSTS: Endpoint<PopularPostsArgs, Vec<RedditPost>> = Endpoint {
    name: "getPopularPosts",
    build_request: popular_request,
    transform: posts_from_listing,
    provides_tags: generic_posts_tags,
};

/// Post search, tagged `Posts`
pub const SEARCH_POSTS: Endpoint<SearchPostsArgs, Vec<RedditPost>> = Endpoint {
    name: "searchPosts",
    build_request: search_request,
    transform: posts_from_listing,
    provides_tags: generic_posts_tags,
};

fn top_request(subreddit: &str, limit: Option<u32>, timeframe: Option<Timeframe>) -> RequestDescriptor {
    RequestDescriptor::get(format!("/r/{}/top.json", subreddit))
        .query("limit", limit.unwrap_or(DEFAULT_LIMIT))
        .query("t", timeframe.unwrap_or_default().as_str())
}

fn subreddit_request(args: &SubredditPostsArgs) -> RequestDescriptor {
    top_request(&args.subreddit, args.limit, args.timeframe)
}

fn popular_request(args: &PopularPostsArgs) -> RequestDescriptor {
    top_request("popular", args.limit, args.timeframe)
}

fn search_request(args: &SearchPostsArgs) -> RequestDescriptor {
    let subreddit = args.subreddit.as_deref().unwrap_or("all");
    RequestDescriptor::get(format!("/r/{}/search.json", subreddit))
        .query("q", &args.query)
        .query("limit", args.limit.unwrap_or(DEFAULT_LIMIT))
        .query("restrict_sr", "true")
}

/// Unwraps a post listing into its posts
pub fn posts_from_listing(payload: Value) -> Result<Vec<RedditPost>, QueryError> {
    let listing: Listing<RedditPost> = serde_json::from_value(payload).map_err(QueryError::decode)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .collect())
}

fn subreddit_tags(args: &SubredditPostsArgs) -> Vec<Tag> {
    vec![Tag::with_id(POSTS_TAG, args.subreddit.clone())]
}

fn generic_posts_tags<A>(_: &A) -> Vec<Tag> {
    vec![Tag::new(POSTS_TAG)]
}
