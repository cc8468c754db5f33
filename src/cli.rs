//! Command-line interface parsing for the redquery host
//!
//! This module turns clap arguments into a [`StartupConfig`]: which listing to
//! show, how to reach the API, and whether to keep refreshing it.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::config::{HttpConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::data::{
    PopularPostsArgs, PostCommentsArgs, SearchPostsArgs, SubredditPostsArgs, Timeframe,
};

/// Largest page size the listing API accepts
pub const MAX_LIMIT: u32 = 100;

/// Subreddit shown when none is given
pub const DEFAULT_SUBREDDIT: &str = "programming";

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The specified timeframe name is not recognized
    #[error("Invalid timeframe: '{0}'. Valid timeframes: hour, day, week, month, year, all")]
    InvalidTimeframe(String),
    /// The page size is outside the range the API accepts
    #[error("Invalid limit: {0}. Limit must be between 1 and 100")]
    InvalidLimit(u32),
}

/// redquery - Browse public Reddit listings through a deduplicating query cache
#[derive(Parser, Debug)]
#[command(name = "redquery")]
#[command(about = "Browse public Reddit listings through a deduplicating query cache")]
#[command(version)]
pub struct Cli {
    /// Subreddit to list (or to search in, or that a post belongs to)
    ///
    /// Defaults to r/programming for top listings and to all of Reddit for searches.
    #[arg(short, long, value_name = "NAME")]
    pub subreddit: Option<String>,

    /// Time window for top listings
    ///
    /// Valid timeframes: hour, day, week, month, year, all
    #[arg(short, long, default_value = "day", value_name = "TIMEFRAME")]
    pub timeframe: String,

    /// Number of posts to request
    #[arg(short, long, default_value_t = 25)]
    pub limit: u32,

    /// Show top posts of r/popular
    #[arg(long, conflicts_with_all = ["search", "comments"])]
    pub popular: bool,

    /// Search posts instead of listing top posts
    #[arg(long, value_name = "QUERY", conflicts_with = "comments")]
    pub search: Option<String>,

    /// Show the comment thread of a post in --subreddit
    #[arg(long, value_name = "POST_ID")]
    pub comments: Option<String>,

    /// Invalidate and reprint the listing every SECONDS until interrupted
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh: Option<u64>,

    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10, value_name = "SECONDS")]
    pub timeout: u64,

    /// Log cache activity to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// The listing a run shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Subreddit(SubredditPostsArgs),
    Popular(PopularPostsArgs),
    Search(SearchPostsArgs),
    Comments(PostCommentsArgs),
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub listing: Listing,
    pub http: HttpConfig,
    /// Interval between refreshes; a single fetch when `None`
    pub refresh: Option<Duration>,
    pub verbose: bool,
}

/// Parses a timeframe argument.
///
/// # Returns
/// * `Ok(Timeframe)` if the string names a valid timeframe
/// * `Err(CliError::InvalidTimeframe)` otherwise
pub fn parse_timeframe_arg(s: &str) -> Result<Timeframe, CliError> {
    Timeframe::parse(s).ok_or_else(|| CliError::InvalidTimeframe(s.to_string()))
}

fn check_limit(limit: u32) -> Result<u32, CliError> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(CliError::InvalidLimit(limit))
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// Validation happens here, before any client is built, so bad arguments
    /// never reach the network.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let timeframe = parse_timeframe_arg(&cli.timeframe)?;
        let limit = check_limit(cli.limit)?;

        let listing = if let Some(post_id) = &cli.comments {
            let subreddit = cli.subreddit.as_deref().unwrap_or(DEFAULT_SUBREDDIT);
            Listing::Comments(PostCommentsArgs::new(subreddit, post_id.as_str()))
        } else if let Some(query) = &cli.search {
            Listing::Search(SearchPostsArgs {
                subreddit: cli.subreddit.clone(),
                limit: Some(limit),
                ..SearchPostsArgs::new(query.as_str())
            })
        } else if cli.popular {
            Listing::Popular(PopularPostsArgs {
                limit: Some(limit),
                timeframe: Some(timeframe),
            })
        } else {
            let subreddit = cli.subreddit.as_deref().unwrap_or(DEFAULT_SUBREDDIT);
            Listing::Subreddit(
                SubredditPostsArgs::new(subreddit)
                    .limit(limit)
                    .timeframe(timeframe),
            )
        };

        Ok(StartupConfig {
            listing,
            http: HttpConfig {
                base_url: cli.base_url.clone(),
                user_agent: cli.user_agent.clone(),
                request_timeout: Duration::from_secs(cli.timeout),
            },
            refresh: cli.refresh.map(Duration::from_secs),
            verbose: cli.verbose,
        })
    }
}
