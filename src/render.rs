//! Plain-text rendering of listings for the CLI host

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::data::{RedditComment, RedditPost};

/// Indentation per reply level
const INDENT: &str = "  ";

/// Human-readable age of a Unix timestamp relative to `now`, e.g. "3h ago"
pub fn format_age(created_utc: f64, now: DateTime<Utc>) -> String {
    let Some(created) = DateTime::<Utc>::from_timestamp(created_utc as i64, 0) else {
        return "unknown".to_string();
    };
    let secs = now.signed_duration_since(created).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Link shown for a post: its discussion page when known, otherwise its URL
pub fn post_link(post: &RedditPost, base_url: &str) -> String {
    match &post.permalink {
        Some(permalink) => format!("{}{}", base_url.trim_end_matches('/'), permalink),
        None => post.url.clone(),
    }
}

/// Numbered post listing, three lines per post
pub fn render_posts(posts: &[RedditPost], base_url: &str, now: DateTime<Utc>) -> String {
    if posts.is_empty() {
        return "No posts found.\n".to_string();
    }

    let mut out = String::new();
    for (i, post) in posts.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. [{}] {}", i + 1, post.score, post.title);
        let _ = writeln!(
            out,
            "     r/{} by u/{} | {} comments | {}",
            post.subreddit,
            post.author,
            post.num_comments,
            format_age(post.created_utc, now)
        );
        let _ = writeln!(out, "     {}", post_link(post, base_url));
    }
    out
}

/// Comment tree with replies indented under their parent
pub fn render_comments(comments: &[RedditComment], now: DateTime<Utc>) -> String {
    if comments.is_empty() {
        return "No comments yet.\n".to_string();
    }

    let mut out = String::new();
    for comment in comments {
        write_comment(&mut out, comment, 0, now);
    }
    out
}

fn write_comment(out: &mut String, comment: &RedditComment, depth: usize, now: DateTime<Utc>) {
    let indent = INDENT.repeat(depth);
    let _ = writeln!(
        out,
        "{}u/{} [{}] {}",
        indent,
        comment.author,
        comment.score,
        format_age(comment.created_utc, now)
    );
    for line in comment.body.lines() {
        let _ = writeln!(out, "{}{}", indent, line);
    }
    for reply in &comment.replies {
        write_comment(out, reply, depth + 1, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_010_000, 0).unwrap()
    }

    fn post(permalink: Option<&str>) -> RedditPost {
        RedditPost {
            id: "abc".to_string(),
            title: "Hello".to_string(),
            author: "ferris".to_string(),
            subreddit: "rust".to_string(),
            selftext: String::new(),
            score: 42,
            num_comments: 7,
            url: "https://example.com/post".to_string(),
            permalink: permalink.map(str::to_string),
            created_utc: 1_700_000_000.0,
            thumbnail: String::new(),
        }
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(1_700_010_000.0, now()), "just now");
        assert_eq!(format_age(1_700_009_700.0, now()), "5m ago");
        assert_eq!(format_age(1_700_000_000.0, now()), "2h ago");
        assert_eq!(format_age(1_699_800_000.0, now()), "2d ago");
    }

    #[test]
    fn test_post_link_prefers_permalink() {
        let with = post(Some("/r/rust/comments/abc/hello/"));
        assert_eq!(
            post_link(&with, "https://www.reddit.com/"),
            "https://www.reddit.com/r/rust/comments/abc/hello/"
        );
        assert_eq!(post_link(&post(None), "https://www.reddit.com"), "https://example.com/post");
    }

    #[test]
    fn test_render_posts() {
        let out = render_posts(&[post(None)], "https://www.reddit.com", now());
        assert!(out.contains("  1. [42] Hello"));
        assert!(out.contains("r/rust by u/ferris | 7 comments | 2h ago"));
        assert!(out.contains("https://example.com/post"));
    }

    #[test]
    fn test_render_empty_listings() {
        assert_eq!(render_posts(&[], "", now()), "No posts found.\n");
        assert_eq!(render_comments(&[], now()), "No comments yet.\n");
    }

    #[test]
    fn test_render_comments_indents_replies() {
        let reply = RedditComment {
            id: "c2".to_string(),
            author: "crab".to_string(),
            body: "agreed".to_string(),
            score: 1,
            created_utc: 1_700_010_000.0,
            replies: Vec::new(),
        };
        let comment = RedditComment {
            id: "c1".to_string(),
            author: "ferris".to_string(),
            body: "first!".to_string(),
            score: 3,
            created_utc: 1_700_000_000.0,
            replies: vec![reply],
        };

        let out = render_comments(&[comment], now());
        assert_eq!(
            out,
            "u/ferris [3] 2h ago\nfirst!\n  u/crab [1] just now\n  agreed\n"
        );
    }
}
