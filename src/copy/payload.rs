use crate::config::{ExtensionSettings, PlatformPreferences};
use crate::pr::{Platform, PullRequestData, PullRequestLocation};

/// The same message in the two clipboard formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPayload {
    pub text: String,
    pub html: String,
}

/// Formatting choices taken from the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkPreferences {
    pub platforms: PlatformPreferences,
    pub include_branch_name: bool,
}

impl From<&ExtensionSettings> for LinkPreferences {
    fn from(settings: &ExtensionSettings) -> Self {
        Self {
            platforms: settings.platforms,
            include_branch_name: settings.include_branch_name,
        }
    }
}

/// Build the citation:
///
/// `[owner/repo/42]: Title (+10/-2) [[github](https://github.com/owner/repo/pull/42)]`
///
/// With `include_branch_name` and a known branch the header becomes
/// `[owner/repo/42][branch]`. With no platform enabled the trailing link
/// section is left out entirely.
pub fn format_payload(
    location: &PullRequestLocation,
    data: &PullRequestData,
    preferences: &LinkPreferences,
) -> CopyPayload {
    let reference = format!("{}/{}", location.slug(), location.number);
    let branch = data
        .branch_name
        .as_deref()
        .filter(|_| preferences.include_branch_name);
    let stats = format!("(+{}/-{})", data.additions, data.deletions);

    let links: Vec<(&str, String)> = preferences
        .platforms
        .enabled()
        .into_iter()
        .map(|platform| {
            let url = match platform {
                Platform::GitHub => data.canonical_url.clone(),
                Platform::Graphite => location.graphite_url(),
            };
            (platform.label(), url)
        })
        .collect();

    let mut text = format!("[{reference}]");
    let mut html = format!("<strong>[{}]", escape_html(&reference));
    if let Some(branch) = branch {
        text.push_str(&format!("[{branch}]"));
        html.push_str(&format!("[{}]", escape_html(branch)));
    }
    text.push_str(&format!(": {} {}", data.title, stats));
    html.push_str(&format!(":</strong> {} {}", escape_html(&data.title), stats));

    if !links.is_empty() {
        let text_links: Vec<String> = links
            .iter()
            .map(|(label, url)| format!("[{label}]({url})"))
            .collect();
        let html_links: Vec<String> = links
            .iter()
            .map(|(label, url)| format!("<a href=\"{}\">{}</a>", escape_html(url), label))
            .collect();
        text.push_str(&format!(" [{}]", text_links.join(", ")));
        html.push_str(&format!(" [{}]", html_links.join(", ")));
    }

    CopyPayload { text, html }
}

/// Escape `& < > " '` for HTML text and attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
