use async_trait::async_trait;

use super::api::GitHubApi;
use super::{PullRequestSource, SourceError};
use crate::pr::{PullRequestData, PullRequestLocation};

/// Reads PRs through the GitHub API with the user's personal access token.
pub struct UserTokenSource {
    api: GitHubApi,
    token: String,
}

impl UserTokenSource {
    /// Fails with `MissingToken` for a blank token, before any request is made.
    pub fn new(api: GitHubApi, token: &str) -> Result<Self, SourceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SourceError::MissingToken);
        }
        Ok(Self {
            api,
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl PullRequestSource for UserTokenSource {
    fn name(&self) -> &str {
        "user-token"
    }

    async fn fetch(&self, location: &PullRequestLocation) -> Result<PullRequestData, SourceError> {
        self.api.get_pull_request(location, Some(&self.token)).await
    }
}
