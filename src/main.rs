//! redquery - Browse public Reddit listings from the terminal
//!
//! Fetches one listing through the query cache and prints it. With
//! `--refresh`, invalidates the listing's tags on a timer and reprints until
//! interrupted.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use redquery::cache::{Endpoint, QueryClient, QueryResult};
use redquery::cli::{Cli, Listing, StartupConfig};
use redquery::config::CacheConfig;
use redquery::data::{
    RedditComment, RedditPost, POPULAR_POSTS, POST_COMMENTS, SEARCH_POSTS, SUBREDDIT_POSTS,
};
use redquery::gc::GcHandle;
use redquery::render::{render_comments, render_posts};
use redquery::transport::HttpTransport;

/// Sets up tracing output on stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "redquery=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fetches one listing, prints it, and keeps refreshing it if asked
///
/// Returns whether the last fetch succeeded.
async fn show<A, T>(
    client: &QueryClient,
    endpoint: &Endpoint<A, T>,
    args: &A,
    refresh: Option<Duration>,
    render: impl Fn(&T) -> String,
) -> Result<bool, Box<dyn std::error::Error>>
where
    A: serde::Serialize,
    T: Clone + Send + Sync + 'static,
{
    let mut subscription = client.execute(endpoint, args)?;
    let mut ok = print_result(&subscription.settled().await, &render);

    let Some(every) = refresh else {
        return Ok(ok);
    };

    let tags = (endpoint.provides_tags)(args);
    let mut interval = tokio::time::interval(every);
    // Skip the first tick (immediate)
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let report = client.invalidate(&tags);
        // A failed first fetch never got its tags indexed
        if report.is_empty() {
            subscription.refetch();
        }
        info!(refetched = report.refetched.len(), "refreshing listing");

        let interrupted = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let Some(result) = subscription.settled_until(interrupted).await else {
            break;
        };
        println!();
        ok = print_result(&result, &render);
    }
    Ok(ok)
}

fn print_result<T>(result: &QueryResult<T>, render: &impl Fn(&T) -> String) -> bool {
    if let Some(err) = result.error() {
        eprintln!("Error: {}", err);
        return false;
    }
    if let Some(data) = result.data() {
        print!("{}", render(data));
    }
    true
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Validate before anything touches the network
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(2);
        }
    };
    init_tracing(config.verbose);

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: StartupConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let transport = HttpTransport::new(&config.http)?;
    let client = QueryClient::new(Arc::new(transport), CacheConfig::default());
    let gc = GcHandle::spawn(client.clone());

    let base_url = config.http.base_url.clone();
    let posts = move |posts: &Vec<RedditPost>| render_posts(posts, &base_url, Utc::now());
    let comments = |comments: &Vec<RedditComment>| render_comments(comments, Utc::now());

    let ok = match &config.listing {
        Listing::Subreddit(args) => show(&client, &SUBREDDIT_POSTS, args, config.refresh, posts).await?,
        Listing::Popular(args) => show(&client, &POPULAR_POSTS, args, config.refresh, posts).await?,
        Listing::Search(args) => show(&client, &SEARCH_POSTS, args, config.refresh, posts).await?,
        Listing::Comments(args) => show(&client, &POST_COMMENTS, args, config.refresh, comments).await?,
    };

    gc.shutdown().await;
    Ok(ok)
}
