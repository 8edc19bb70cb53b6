pub mod selectors;
pub mod stats;

pub use selectors::{SelectorConfig, SelectorOverrides};
pub use stats::DiffStats;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::pr::{Platform, PullRequestData, PullRequestLocation};
use selectors::{CompiledList, CompiledPlatform};

static GRAPHITE_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\d+\s+").expect("valid number prefix pattern"));

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// A read-only snapshot of a rendered page plus the platform it came from.
pub struct PageDocument {
    html: Html,
    platform: Platform,
}

impl PageDocument {
    /// Parse page markup, classifying the platform from the page URL's host.
    pub fn parse(page_url: &Url, markup: &str) -> Self {
        let platform = Platform::from_host(page_url.host_str().unwrap_or_default());
        Self::with_platform(platform, markup)
    }

    pub fn with_platform(platform: Platform, markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            platform,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

/// Pulls PR facts out of a page using layered selector fallbacks.
///
/// Every field is looked up independently and the first candidate that
/// survives normalization wins. Only the title is mandatory.
pub struct Extractor {
    github: CompiledPlatform,
    graphite: CompiledPlatform,
    shared_title: CompiledList,
    social_title: CompiledList,
    links: Selector,
}

impl Extractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, ScrapeError> {
        let links = Selector::parse("a[href]").map_err(|err| ScrapeError::InvalidSelector {
            selector: "a[href]".to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            github: CompiledPlatform::compile(&config.github)?,
            graphite: CompiledPlatform::compile(&config.graphite)?,
            shared_title: CompiledList::compile(&config.shared.title)?,
            social_title: CompiledList::compile(&config.shared.social_title)?,
            links,
        })
    }

    fn selectors(&self, platform: Platform) -> &CompiledPlatform {
        match platform {
            Platform::GitHub => &self.github,
            Platform::Graphite => &self.graphite,
        }
    }

    /// Extract PR data from a page. Returns None when no title can be found.
    #[instrument(skip(self, document), fields(platform = %document.platform(), pr = location.number))]
    pub fn extract(
        &self,
        document: &PageDocument,
        location: &PullRequestLocation,
    ) -> Option<PullRequestData> {
        let title = self.read_title(document)?;
        let stats = self.read_diff_stats(document).unwrap_or_default();
        let branch_name = self.read_branch_name(document, location);
        debug!(title = %title, additions = stats.additions, deletions = stats.deletions, branch = ?branch_name, "extracted PR from page");

        Some(PullRequestData {
            title,
            additions: stats.additions,
            deletions: stats.deletions,
            canonical_url: location.canonical_url(),
            branch_name,
        })
    }

    fn read_title(&self, document: &PageDocument) -> Option<String> {
        let platform = self.selectors(document.platform);
        let structural = platform.title.iter().chain(self.shared_title.iter());

        for selector in structural {
            for element in document.html.select(selector) {
                if let Some(title) = clean_title(&element_text(element), document.platform) {
                    return Some(title);
                }
            }
        }

        for selector in self.social_title.iter() {
            for element in document.html.select(selector) {
                let content = element.value().attr("content").unwrap_or_default();
                if let Some(title) = clean_title(&strip_site_suffix(content), document.platform) {
                    return Some(title);
                }
            }
        }

        None
    }

    fn read_diff_stats(&self, document: &PageDocument) -> Option<DiffStats> {
        let platform = self.selectors(document.platform);

        for selector in platform.diffstat.iter() {
            for element in document.html.select(selector) {
                let from_label = element
                    .value()
                    .attr("aria-label")
                    .and_then(stats::parse_stats_text);
                let found = from_label
                    .or_else(|| stats::parse_stats_text(&element_text(element)))
                    .or_else(|| read_marker_stats(element, platform));
                if found.is_some() {
                    return found;
                }
            }
        }

        None
    }

    fn read_branch_name(
        &self,
        document: &PageDocument,
        location: &PullRequestLocation,
    ) -> Option<String> {
        let platform = self.selectors(document.platform);

        for selector in platform.branch_meta.iter() {
            for element in document.html.select(selector) {
                if let Some(branch) = normalize_branch(element.value().attr("content")) {
                    return Some(branch);
                }
            }
        }

        for selector in platform.branch.iter() {
            for element in document.html.select(selector) {
                let text = element_text(element);
                let candidate = normalize_branch(Some(&text))
                    .or_else(|| normalize_branch(element.value().attr("title")));
                if candidate.is_some() {
                    return candidate;
                }
            }
        }

        document
            .html
            .select(&self.links)
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| branch_from_tree_link(href, location))
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn read_marker_stats(element: ElementRef<'_>, platform: &CompiledPlatform) -> Option<DiffStats> {
    let first_text = |list: &CompiledList| {
        list.iter()
            .find_map(|selector| element.select(selector).next())
            .map(element_text)
    };
    let additions = first_text(&platform.addition_markers);
    let deletions = first_text(&platform.deletion_markers);
    stats::parse_marker_texts(additions.as_deref(), deletions.as_deref())
}

/// Trim, collapse whitespace and, on Graphite, drop a leading "#123 "
/// number prefix. Empty results are rejected.
fn clean_title(raw: &str, platform: Platform) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = match platform {
        Platform::Graphite => GRAPHITE_NUMBER_PREFIX.replace(&collapsed, ""),
        Platform::GitHub => collapsed.as_str().into(),
    };
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Social titles carry a trailing " · Site" segment. Only the last one is
/// removed; a bare "·" inside a word is part of the title.
fn strip_site_suffix(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let padded = format!(" {collapsed}");
    match padded.rsplit_once(" \u{00B7} ") {
        Some((head, _)) => head.trim().to_string(),
        None => collapsed,
    }
}

fn normalize_branch(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Branch name from a link like `/{owner}/{repo}/tree/{branch}`.
/// Only the first segment after `tree/` is taken.
fn branch_from_tree_link(href: &str, location: &PullRequestLocation) -> Option<String> {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let needle = format!("/{}/{}/tree/", location.owner, location.repo).to_ascii_lowercase();
    let start = path.to_ascii_lowercase().find(&needle)? + needle.len();
    let segment = path.get(start..)?.split('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    normalize_branch(Some(&decoded))
}
