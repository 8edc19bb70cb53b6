use scraper::Selector;
use serde::{Deserialize, Serialize};

use super::ScrapeError;

/// CSS selector lists for one hosting UI, tried in order.
///
/// These track third-party markup (including hashed class-name prefixes on
/// Graphite) and drift over time, so every list can be replaced from the
/// `[selectors.*]` tables of the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSelectors {
    pub title: Vec<String>,
    pub diffstat: Vec<String>,
    pub addition_markers: Vec<String>,
    pub deletion_markers: Vec<String>,
    /// `<meta>` tags carrying the head ref in their `content` attribute
    pub branch_meta: Vec<String>,
    pub branch: Vec<String>,
}

/// Fallbacks shared by every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSelectors {
    pub title: Vec<String>,
    /// `<meta>` tags carrying a social/OpenGraph title in their `content` attribute
    pub social_title: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub github: PlatformSelectors,
    pub graphite: PlatformSelectors,
    pub shared: SharedSelectors,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl PlatformSelectors {
    pub fn github() -> Self {
        Self {
            title: owned(&[
                "[data-testid='issue-title']",
                ".js-issue-title",
                "h1[data-test-selector='issue-title']",
                ".gh-header-title .markdown-title",
            ]),
            diffstat: owned(&[
                "[data-test-selector='diff-stats']",
                "[data-component='diffstat']",
                "#diffstat",
                ".diffstat",
            ]),
            addition_markers: owned(&[".color-fg-success"]),
            deletion_markers: owned(&[".color-fg-danger"]),
            branch_meta: owned(&["meta[name='head-ref']", "meta[name='pr-head-ref']"]),
            branch: owned(&[
                ".head-ref",
                "[data-testid='head-ref']",
                ".commit-ref.head-ref a",
            ]),
        }
    }

    pub fn graphite() -> Self {
        Self {
            title: owned(&[
                "[data-testid='pr-title']",
                "[class*='PullRequestTitle_title']",
                "[class*='PRTitle_']",
                "[class*='PullRequestHeader_'] h1",
            ]),
            diffstat: owned(&[
                "[data-testid='diff-stats']",
                "[class*='DiffStats_']",
                "[class*='diffStat']",
            ]),
            addition_markers: owned(&["[class*='additions']", "[class*='Additions']"]),
            deletion_markers: owned(&["[class*='deletions']", "[class*='Deletions']"]),
            branch_meta: Vec::new(),
            branch: owned(&[
                "[data-testid='branch-name']",
                "[class*='BranchName_']",
                "[class*='branchName']",
            ]),
        }
    }

    /// Replace each list that the override provides.
    pub fn apply(&mut self, overrides: &PlatformSelectorOverrides) {
        replace(&mut self.title, &overrides.title);
        replace(&mut self.diffstat, &overrides.diffstat);
        replace(&mut self.addition_markers, &overrides.addition_markers);
        replace(&mut self.deletion_markers, &overrides.deletion_markers);
        replace(&mut self.branch_meta, &overrides.branch_meta);
        replace(&mut self.branch, &overrides.branch);
    }
}

impl Default for SharedSelectors {
    fn default() -> Self {
        Self {
            title: owned(&["main h1", "h1"]),
            social_title: owned(&["meta[property='og:title']", "meta[name='twitter:title']"]),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            github: PlatformSelectors::github(),
            graphite: PlatformSelectors::graphite(),
            shared: SharedSelectors::default(),
        }
    }
}

impl SelectorConfig {
    /// Defaults with any configured lists swapped in.
    pub fn with_overrides(overrides: &SelectorOverrides) -> Self {
        let mut config = Self::default();
        config.github.apply(&overrides.github);
        config.graphite.apply(&overrides.graphite);
        replace(&mut config.shared.title, &overrides.shared.title);
        replace(&mut config.shared.social_title, &overrides.shared.social_title);
        config
    }
}

fn replace(target: &mut Vec<String>, source: &Option<Vec<String>>) {
    if let Some(list) = source {
        target.clone_from(list);
    }
}

/// `[selectors]` section of the config file. Absent lists keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectorOverrides {
    #[serde(default)]
    pub github: PlatformSelectorOverrides,
    #[serde(default)]
    pub graphite: PlatformSelectorOverrides,
    #[serde(default)]
    pub shared: SharedSelectorOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlatformSelectorOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffstat: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addition_markers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_markers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_meta: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SharedSelectorOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_title: Option<Vec<String>>,
}

/// A selector list parsed once, ready to query documents with.
pub(crate) struct CompiledList(Vec<Selector>);

impl CompiledList {
    pub(crate) fn compile(list: &[String]) -> Result<Self, ScrapeError> {
        list.iter()
            .map(|raw| {
                Selector::parse(raw).map_err(|err| ScrapeError::InvalidSelector {
                    selector: raw.clone(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CompiledList)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.0.iter()
    }
}

pub(crate) struct CompiledPlatform {
    pub(crate) title: CompiledList,
    pub(crate) diffstat: CompiledList,
    pub(crate) addition_markers: CompiledList,
    pub(crate) deletion_markers: CompiledList,
    pub(crate) branch_meta: CompiledList,
    pub(crate) branch: CompiledList,
}

impl CompiledPlatform {
    pub(crate) fn compile(selectors: &PlatformSelectors) -> Result<Self, ScrapeError> {
        Ok(Self {
            title: CompiledList::compile(&selectors.title)?,
            diffstat: CompiledList::compile(&selectors.diffstat)?,
            addition_markers: CompiledList::compile(&selectors.addition_markers)?,
            deletion_markers: CompiledList::compile(&selectors.deletion_markers)?,
            branch_meta: CompiledList::compile(&selectors.branch_meta)?,
            branch: CompiledList::compile(&selectors.branch)?,
        })
    }
}
