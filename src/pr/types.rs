use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Host of the canonical hosting platform.
pub const GITHUB_HOST: &str = "github.com";

/// Link template for the Graphite mirror UI.
const GRAPHITE_PR_BASE: &str = "https://app.graphite.dev/github/pr";

/// Identifies a pull request uniquely on GitHub.
/// Extracted by parse_location() in pr/mod.rs, once per navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestLocation {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestLocation {
    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// The GitHub page for this PR. Never a mirror URL.
    pub fn canonical_url(&self) -> String {
        format!(
            "https://{}/{}/{}/pull/{}",
            GITHUB_HOST, self.owner, self.repo, self.number
        )
    }

    pub fn graphite_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            GRAPHITE_PR_BASE, self.owner, self.repo, self.number
        )
    }
}

/// Normalized facts about a pull request, whichever source produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestData {
    /// PR title, already trimmed
    pub title: String,
    /// Total lines added
    pub additions: u64,
    /// Total lines deleted
    pub deletions: u64,
    /// Always the GitHub PR page, even when a mirror page was scraped
    pub canonical_url: String,
    /// Head branch, when the source could find one
    pub branch_name: Option<String>,
}

/// The hosting UI a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Platform {
    #[value(name = "github")]
    GitHub,
    #[value(name = "graphite")]
    Graphite,
}

impl Platform {
    /// Classify a page by its host name. Unknown hosts are treated as GitHub.
    pub fn from_host(host: &str) -> Platform {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if host == "graphite.dev"
            || host.ends_with(".graphite.dev")
            || host == "graphite.com"
            || host.ends_with(".graphite.com")
        {
            Platform::Graphite
        } else {
            Platform::GitHub
        }
    }

    /// Label used in copied links.
    pub fn label(self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::Graphite => "graphite",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> PullRequestLocation {
        PullRequestLocation {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 42,
        }
    }

    #[test]
    fn test_location_urls() {
        let loc = location();
        assert_eq!(loc.slug(), "acme/widgets");
        assert_eq!(loc.canonical_url(), "https://github.com/acme/widgets/pull/42");
        assert_eq!(
            loc.graphite_url(),
            "https://app.graphite.dev/github/pr/acme/widgets/42"
        );
    }

    #[test]
    fn test_platform_from_host() {
        assert_eq!(Platform::from_host("github.com"), Platform::GitHub);
        assert_eq!(Platform::from_host("app.graphite.dev"), Platform::Graphite);
        assert_eq!(Platform::from_host("APP.GRAPHITE.DEV"), Platform::Graphite);
        assert_eq!(Platform::from_host("notgraphite.dev"), Platform::GitHub);
        assert_eq!(Platform::from_host("example.com"), Platform::GitHub);
    }
}
