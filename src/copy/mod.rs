pub mod clipboard;
pub mod payload;

pub use clipboard::{write_payload, ClipboardError, ClipboardSink};
pub use payload::{format_payload, CopyPayload, LinkPreferences};

use thiserror::Error;
use tracing::{info, instrument};

use crate::config::ExtensionSettings;
use crate::pr::{PrError, PullRequestLocation};
use crate::source::{CurrentPage, Resolver, SourceError};

/// Everything a copy attempt can fail with. The button shows its error
/// state for all of them.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Not a pull request page: {0}")]
    NotAPullRequest(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Unable to load PR details")]
    SourceUnavailable(#[source] SourceError),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

impl From<PrError> for CopyError {
    fn from(err: PrError) -> Self {
        CopyError::NotAPullRequest(err.to_string())
    }
}

/// Resolve the PR, format the citation and write it to `sink`.
///
/// Nothing is written unless resolution succeeds.
#[instrument(skip_all, fields(pr = %location.slug(), number = location.number))]
pub async fn copy_pull_request(
    resolver: &Resolver,
    location: &PullRequestLocation,
    settings: &ExtensionSettings,
    page: &CurrentPage,
    sink: &mut dyn ClipboardSink,
) -> Result<CopyPayload, CopyError> {
    let data = resolver.resolve(location, settings, page).await?;
    let payload = format_payload(location, &data, &LinkPreferences::from(settings));
    write_payload(sink, &payload)?;
    info!(additions = data.additions, deletions = data.deletions, "copied pull request citation");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Mode, PlatformPreferences};
    use crate::scrape::{Extractor, SelectorConfig};
    use crate::source::token_cache::tests::ManualClock;
    use clipboard::tests::MemoryClipboard;
    use reqwest::Url;
    use std::sync::Arc;

    fn resolver() -> Resolver {
        let mut config = Config::default();
        // Nothing listens here; dom-scrape with supplied markup never connects.
        config.github.api_base_url = "http://127.0.0.1:9".to_string();
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        let extractor = Arc::new(Extractor::new(&SelectorConfig::default()).unwrap());
        Resolver::from_config(&config, extractor, ManualClock::new())
    }

    fn location() -> PullRequestLocation {
        PullRequestLocation {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 42,
        }
    }

    fn page(markup: &str) -> CurrentPage {
        CurrentPage::with_markup(
            Url::parse("https://github.com/acme/widgets/pull/42").unwrap(),
            markup.to_string(),
        )
    }

    fn settings() -> ExtensionSettings {
        ExtensionSettings {
            mode: Mode::DomScrape,
            platforms: PlatformPreferences::default(),
            token: String::new(),
            include_branch_name: false,
        }
    }

    const PAGE: &str = r#"
        <h1><bdi class="js-issue-title">Add retry logic</bdi></h1>
        <div id="diffstat"><span class="color-fg-success">+10</span><span class="color-fg-danger">−2</span></div>
    "#;

    #[tokio::test]
    async fn test_copy_writes_both_formats() {
        let mut sink = MemoryClipboard {
            rich: true,
            ..Default::default()
        };
        let payload = copy_pull_request(&resolver(), &location(), &settings(), &page(PAGE), &mut sink)
            .await
            .unwrap();

        assert_eq!(
            payload.text,
            "[acme/widgets/42]: Add retry logic (+10/-2) [[github](https://github.com/acme/widgets/pull/42)]"
        );
        assert_eq!(sink.text.as_deref(), Some(payload.text.as_str()));
        assert_eq!(sink.html.as_deref(), Some(payload.html.as_str()));
    }

    #[tokio::test]
    async fn test_failed_resolution_writes_nothing() {
        let mut sink = MemoryClipboard {
            rich: true,
            ..Default::default()
        };
        let err = copy_pull_request(&resolver(), &location(), &settings(), &page("<p></p>"), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::SourceUnavailable(SourceError::TitleNotFound)));
        assert!(sink.text.is_none());
        assert!(sink.html.is_none());
    }

    #[tokio::test]
    async fn test_clipboard_failure_is_reported() {
        let mut sink = MemoryClipboard {
            fail: true,
            ..Default::default()
        };
        let err = copy_pull_request(&resolver(), &location(), &settings(), &page(PAGE), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Clipboard(ClipboardError::Write(_))));
    }

    #[test]
    fn test_pr_error_converts_to_not_a_pull_request() {
        let err: CopyError = PrError::NotAPullRequest("https://github.com/acme".to_string()).into();
        assert!(matches!(err, CopyError::NotAPullRequest(_)));
    }
}
