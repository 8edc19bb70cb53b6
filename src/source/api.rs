use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::SourceError;
use crate::pr::{PullRequestData, PullRequestLocation};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub(crate) const CLIENT_USER_AGENT: &str = "pr-copy";

/// Thin client for the one GitHub REST call we need.
#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct HeadRef {
    #[serde(rename = "ref")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct PullResponse {
    title: Option<String>,
    additions: Option<u64>,
    deletions: Option<u64>,
    html_url: Option<String>,
    head: Option<HeadRef>,
}

impl PullResponse {
    fn into_data(self, location: &PullRequestLocation) -> PullRequestData {
        PullRequestData {
            title: self.title.unwrap_or_default().trim().to_string(),
            additions: self.additions.unwrap_or(0),
            deletions: self.deletions.unwrap_or(0),
            canonical_url: self
                .html_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| location.canonical_url()),
            branch_name: self
                .head
                .and_then(|head| head.name)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

impl GitHubApi {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /repos/{owner}/{repo}/pulls/{number}, optionally authenticated.
    ///
    /// Without a token the request counts against the anonymous rate limit
    /// and only works for public repositories.
    #[instrument(skip(self, token), fields(owner = %location.owner, repo = %location.repo, pr = location.number, authenticated = token.is_some()))]
    pub async fn get_pull_request(
        &self,
        location: &PullRequestLocation,
        token: Option<&str>,
    ) -> Result<PullRequestData, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_url, location.owner, location.repo, location.number
        );

        let mut request = self
            .client
            .get(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!("fetching PR metadata from GitHub API");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                service: "GitHub API",
                status: status.as_u16(),
                body,
            });
        }

        let data = response.json::<PullResponse>().await?.into_data(location);
        debug!(title = %data.title, additions = data.additions, deletions = data.deletions, "received PR metadata");
        Ok(data)
    }
}
