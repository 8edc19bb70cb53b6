pub mod button;

pub use button::{ButtonState, CopyButton};

use reqwest::Url;
use tracing::debug;

use crate::pr::{parse_location, PullRequestLocation};

/// What a navigation event did to the button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Same path and query as the previous event.
    Unchanged,
    /// First PR page seen: the button was created.
    Mounted(PullRequestLocation),
    /// The existing button now points at another PR.
    Retargeted(PullRequestLocation),
    /// Left PR pages: the button was taken off the page.
    Removed,
    /// Not a PR page and no button to remove.
    NotAPullRequest,
}

/// Keeps at most one button alive across in-page navigations.
#[derive(Debug, Default)]
pub struct PageWatcher {
    last_key: Option<String>,
    current_url: Option<Url>,
    button: Option<CopyButton>,
}

impl PageWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, url: &Url) -> Navigation {
        let key = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        if self.last_key.as_deref() == Some(key.as_str()) {
            return Navigation::Unchanged;
        }
        self.last_key = Some(key);
        self.current_url = Some(url.clone());

        match (parse_location(url.path()), self.button.as_mut()) {
            (Some(location), Some(button)) => {
                debug!(pr = %location.slug(), number = location.number, "retargeting button");
                button.retarget(location.clone());
                Navigation::Retargeted(location)
            }
            (Some(location), None) => {
                debug!(pr = %location.slug(), number = location.number, "mounting button");
                self.button = Some(CopyButton::new(location.clone()));
                Navigation::Mounted(location)
            }
            (None, Some(_)) => {
                debug!(path = url.path(), "left pull request page, removing button");
                self.button = None;
                Navigation::Removed
            }
            (None, None) => Navigation::NotAPullRequest,
        }
    }

    pub fn button(&self) -> Option<&CopyButton> {
        self.button.as_ref()
    }

    pub fn button_mut(&mut self) -> Option<&mut CopyButton> {
        self.button.as_mut()
    }

    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }
}
