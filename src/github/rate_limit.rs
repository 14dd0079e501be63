//! Rate-limit detection utilities for GitHub API responses.
//!
//! GitHub signals rate limits through:
//! - HTTP 403 with "API rate limit exceeded" in the body
//! - HTTP 429 (secondary rate limit)
//! - GraphQL errors containing "rate limit"

/// Check whether an error message indicates a GitHub rate limit.
pub(crate) fn is_rate_limited(error: &anyhow::Error) -> bool {
    let msg = format!("{error:#}").to_lowercase();
    msg.contains("rate limit") || msg.contains("status code: 429")
}

/// Message reported to the caller for a failed fetch.
pub(crate) fn describe_fetch_error(error: &anyhow::Error) -> String {
    if !is_rate_limited(error) {
        return format!("{error:#}");
    }
    let msg = format!("{error:#}").to_lowercase();
    if msg.contains("secondary rate limit") {
        "Secondary rate limit hit, wait a moment then retry".to_owned()
    } else {
        "API rate limit exceeded, retry later".to_owned()
    }
}
