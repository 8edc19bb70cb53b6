pub mod types;

pub use types::{Platform, PullRequestData, PullRequestLocation};

use reqwest::Url;
use thiserror::Error;

/// First two path segments of a PR page on the Graphite mirror.
const GRAPHITE_PREFIX: [&str; 2] = ["github", "pr"];

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not a pull request page: {0}")]
    NotAPullRequest(String),
}

/// Extract owner/repo/number from a URL path.
///
/// Two shapes are recognized:
///   /{owner}/{repo}/pull/{number}[/...]        (GitHub)
///   /github/pr/{owner}/{repo}/{number}[/...]   (Graphite)
///
/// Empty segments are ignored. The number must be a plain run of ASCII
/// digits greater than zero; anything else rejects the whole path.
pub fn parse_location(path: &str) -> Option<PullRequestLocation> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [owner, repo, "pull", number, ..] => build_location(owner, repo, number),
        [prefix, marker, owner, repo, number, ..]
            if [*prefix, *marker] == GRAPHITE_PREFIX =>
        {
            build_location(owner, repo, number)
        }
        _ => None,
    }
}

fn build_location(owner: &str, repo: &str, number: &str) -> Option<PullRequestLocation> {
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(PullRequestLocation {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: parse_pr_number(number)?,
    })
}

fn parse_pr_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Parse a full page URL and locate the pull request it shows.
pub fn parse_pr_url(raw: &str) -> Result<(Url, PullRequestLocation), PrError> {
    let url = Url::parse(raw).map_err(|_| PrError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PrError::InvalidUrl(raw.to_string()));
    }
    let location =
        parse_location(url.path()).ok_or_else(|| PrError::NotAPullRequest(raw.to_string()))?;
    Ok((url, location))
}
