use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::api::{GitHubApi, CLIENT_USER_AGENT};
use super::token_cache::{default_lifetime, AccessToken, TokenCache};
use super::{PullRequestSource, SourceError};
use crate::pr::{PullRequestData, PullRequestLocation};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
const API_KEY_HEADER: &str = "x-octocopy-key";

#[derive(Serialize)]
struct MintRequest<'a> {
    owner: &'a str,
    repo: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    token: Option<String>,
    expires_at: Option<String>,
    installation_id: Option<u64>,
}

/// A token issued by the minting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub installation_id: Option<u64>,
}

/// Client for `POST /github-app-token` on the backend.
#[derive(Debug, Clone)]
pub struct TokenService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TokenService {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    #[instrument(skip(self), fields(owner = %location.owner, repo = %location.repo))]
    pub async fn mint(&self, location: &PullRequestLocation) -> Result<MintedToken, SourceError> {
        let mut request = self
            .client
            .post(format!("{}/github-app-token", self.base_url))
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(&MintRequest {
                owner: &location.owner,
                repo: &location.repo,
            });
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                service: "token service",
                status: status.as_u16(),
                body,
            });
        }

        let payload = response.json::<MintResponse>().await?;
        let token = payload
            .token
            .filter(|token| !token.is_empty())
            .ok_or(SourceError::EmptyToken)?;
        let expires_at = payload.expires_at.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|err| warn!(expires_at = raw, error = %err, "ignoring unparseable token expiry"))
                .ok()
        });

        Ok(MintedToken {
            token,
            expires_at,
            installation_id: payload.installation_id,
        })
    }
}

/// Reads PRs through the GitHub API with a token minted by the backend.
///
/// When no token can be obtained the request goes out unauthenticated,
/// which only works for public repositories.
pub struct BackendTokenSource {
    api: GitHubApi,
    service: TokenService,
    cache: Arc<TokenCache>,
}

impl BackendTokenSource {
    pub fn new(api: GitHubApi, service: TokenService, cache: Arc<TokenCache>) -> Self {
        Self {
            api,
            service,
            cache,
        }
    }

    async fn access_token(&self, location: &PullRequestLocation) -> Option<String> {
        let key = location.slug();
        if let Some(token) = self.cache.get(&key) {
            debug!(key = %key, "token cache hit");
            return Some(token);
        }

        debug!(key = %key, "token cache miss, requesting a new token");
        let minted = match self.service.mint(location).await {
            Ok(minted) => minted,
            Err(err) => {
                warn!(error = %err, "token request failed, continuing unauthenticated");
                return None;
            }
        };

        let entry = AccessToken {
            value: minted.token,
            expires_at: minted
                .expires_at
                .unwrap_or_else(|| self.cache.now() + default_lifetime()),
        };
        if let Some(installation_id) = minted.installation_id {
            self.cache.insert(installation_id.to_string(), entry.clone());
        }
        let value = entry.value.clone();
        self.cache.insert(key, entry);
        Some(value)
    }
}

#[async_trait]
impl PullRequestSource for BackendTokenSource {
    fn name(&self) -> &str {
        "backend-token"
    }

    async fn fetch(&self, location: &PullRequestLocation) -> Result<PullRequestData, SourceError> {
        let token = self.access_token(location).await;
        self.api.get_pull_request(location, token.as_deref()).await
    }
}
