use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::api::CLIENT_USER_AGENT;
use super::{PullRequestSource, SourceError};
use crate::pr::{PullRequestData, PullRequestLocation};
use crate::scrape::{Extractor, PageDocument};

/// The page the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPage {
    pub url: Url,
    /// Rendered markup, when already available. Otherwise the page is
    /// downloaded from `url` when it is needed.
    pub markup: Option<String>,
}

impl CurrentPage {
    pub fn new(url: Url) -> Self {
        Self { url, markup: None }
    }

    pub fn with_markup(url: Url, markup: String) -> Self {
        Self {
            url,
            markup: Some(markup),
        }
    }
}

/// Reads PR data off the current page instead of calling an API.
pub struct DomScrapeSource {
    extractor: Arc<Extractor>,
    client: reqwest::Client,
    page: CurrentPage,
}

impl DomScrapeSource {
    pub fn new(extractor: Arc<Extractor>, client: reqwest::Client, page: CurrentPage) -> Self {
        Self {
            extractor,
            client,
            page,
        }
    }

    async fn load_markup(&self) -> Result<String, SourceError> {
        if let Some(markup) = &self.page.markup {
            return Ok(markup.clone());
        }

        debug!(url = %self.page.url, "downloading page for scraping");
        let response = self
            .client
            .get(self.page.url.clone())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                service: "page host",
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(response.text().await?)
    }

    fn scrape(
        &self,
        markup: &str,
        location: &PullRequestLocation,
    ) -> Result<PullRequestData, SourceError> {
        let document = PageDocument::parse(&self.page.url, markup);
        self.extractor
            .extract(&document, location)
            .ok_or(SourceError::TitleNotFound)
    }
}

#[async_trait]
impl PullRequestSource for DomScrapeSource {
    fn name(&self) -> &str {
        "dom-scrape"
    }

    #[instrument(skip(self), fields(page = %self.page.url))]
    async fn fetch(&self, location: &PullRequestLocation) -> Result<PullRequestData, SourceError> {
        let markup = self.load_markup().await?;
        self.scrape(&markup, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::SelectorConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn location() -> PullRequestLocation {
        PullRequestLocation {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 42,
        }
    }

    fn extractor() -> Arc<Extractor> {
        Arc::new(Extractor::new(&SelectorConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_scrapes_supplied_markup() {
        let url = Url::parse("https://app.graphite.dev/github/pr/acme/widgets/42").unwrap();
        let page = CurrentPage::with_markup(
            url,
            r#"<div data-testid="pr-title">#42 Add retry logic</div>
               <div data-testid="diff-stats" aria-label="10 additions and 2 deletions"></div>"#
                .to_string(),
        );
        let source = DomScrapeSource::new(extractor(), reqwest::Client::new(), page);

        let data = source.fetch(&location()).await.unwrap();
        assert_eq!(data.title, "Add retry logic");
        assert_eq!((data.additions, data.deletions), (10, 2));
        assert_eq!(data.canonical_url, "https://github.com/acme/widgets/pull/42");
    }

    #[tokio::test]
    async fn test_missing_title_is_an_error() {
        let url = Url::parse("https://github.com/acme/widgets/pull/42").unwrap();
        let page = CurrentPage::with_markup(url, "<p>Loading…</p>".to_string());
        let source = DomScrapeSource::new(extractor(), reqwest::Client::new(), page);
        assert!(matches!(
            source.fetch(&location()).await,
            Err(SourceError::TitleNotFound)
        ));
    }

    #[tokio::test]
    async fn test_downloads_page_when_no_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/widgets/pull/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:title" content="Fix bug · acme"></head></html>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/acme/widgets/pull/42", server.uri())).unwrap();
        let source = DomScrapeSource::new(extractor(), reqwest::Client::new(), CurrentPage::new(url));
        let data = source.fetch(&location()).await.unwrap();
        assert_eq!(data.title, "Fix bug");
    }
}
