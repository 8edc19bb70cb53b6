pub mod api;
pub mod backend;
pub mod dom;
pub mod token_cache;
pub mod user_token;

pub use dom::CurrentPage;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{Config, ExtensionSettings, Mode};
use crate::copy::CopyError;
use crate::pr::{PullRequestData, PullRequestLocation};
use crate::scrape::Extractor;
use api::GitHubApi;
use backend::{BackendTokenSource, TokenService};
use dom::DomScrapeSource;
use token_cache::{Clock, TokenCache};
use user_token::UserTokenSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("No personal access token configured")]
    MissingToken,

    #[error("Token service response did not contain a token")]
    EmptyToken,

    #[error("No pull request title found on the page")]
    TitleNotFound,
}

/// One way of turning a PR location into normalized PR data.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Mode name, for logs.
    fn name(&self) -> &str;

    async fn fetch(&self, location: &PullRequestLocation) -> Result<PullRequestData, SourceError>;
}

/// Picks a source from the configured mode and runs it.
///
/// There is no fallback between modes: if the chosen source fails, the
/// whole resolution fails.
pub struct Resolver {
    api: GitHubApi,
    backend: Arc<BackendTokenSource>,
    extractor: Arc<Extractor>,
    client: reqwest::Client,
}

impl Resolver {
    pub fn new(
        client: reqwest::Client,
        api: GitHubApi,
        tokens: TokenService,
        cache: Arc<TokenCache>,
        extractor: Arc<Extractor>,
    ) -> Self {
        let backend = Arc::new(BackendTokenSource::new(api.clone(), tokens, cache));
        Self {
            api,
            backend,
            extractor,
            client,
        }
    }

    pub fn from_config(config: &Config, extractor: Arc<Extractor>, clock: Arc<dyn Clock>) -> Self {
        let client = reqwest::Client::new();
        let api = GitHubApi::new(client.clone(), &config.github.api_base_url);
        let tokens = TokenService::new(
            client.clone(),
            &config.backend.base_url,
            config.backend.api_key.clone(),
        );
        Self::new(client, api, tokens, Arc::new(TokenCache::new(clock)), extractor)
    }

    /// The source for `settings.mode`. A blank token in `user-token` mode is
    /// a configuration error, raised before anything touches the network.
    pub fn select(
        &self,
        settings: &ExtensionSettings,
        page: &CurrentPage,
    ) -> Result<Arc<dyn PullRequestSource>, CopyError> {
        let source: Arc<dyn PullRequestSource> = match settings.mode {
            Mode::UserToken => {
                let source = UserTokenSource::new(self.api.clone(), &settings.token).map_err(|_| {
                    CopyError::Configuration(
                        "Add a personal access token to the settings before copying".to_string(),
                    )
                })?;
                Arc::new(source)
            }
            Mode::DomScrape => Arc::new(DomScrapeSource::new(
                self.extractor.clone(),
                self.client.clone(),
                page.clone(),
            )),
            Mode::BackendToken => self.backend.clone(),
        };
        Ok(source)
    }

    #[instrument(skip(self, settings, page), fields(pr = %location.slug(), number = location.number, mode = %settings.mode))]
    pub async fn resolve(
        &self,
        location: &PullRequestLocation,
        settings: &ExtensionSettings,
        page: &CurrentPage,
    ) -> Result<PullRequestData, CopyError> {
        let source = self.select(settings, page)?;
        debug!(source = source.name(), "resolving pull request");
        source.fetch(location).await.map_err(|err| {
            warn!(source = source.name(), error = %err, "pull request source failed");
            CopyError::SourceUnavailable(err)
        })
    }
}
