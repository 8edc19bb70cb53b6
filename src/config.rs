use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::pr::Platform;
use crate::scrape::SelectorOverrides;
use crate::source::api::DEFAULT_API_BASE_URL;
use crate::source::backend::DEFAULT_BACKEND_URL;

/// Settings file looked up in the current directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".pr-copy.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("At least one platform link must stay enabled")]
    NoPlatforms,
}

/// Where pull request data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// GitHub API with a short-lived token minted by the backend
    BackendToken,
    /// GitHub API with the configured personal access token
    UserToken,
    /// Read the rendered page; needs no credentials
    #[default]
    DomScrape,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::BackendToken => "backend-token",
            Mode::UserToken => "user-token",
            Mode::DomScrape => "dom-scrape",
        }
    }

    pub fn parse(raw: &str) -> Option<Mode> {
        match raw.trim() {
            "backend-token" => Some(Mode::BackendToken),
            "user-token" => Some(Mode::UserToken),
            "dom-scrape" => Some(Mode::DomScrape),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which platform links end up in the copied message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformPreferences {
    pub github: bool,
    pub graphite: bool,
}

impl Default for PlatformPreferences {
    fn default() -> Self {
        Self {
            github: true,
            graphite: false,
        }
    }
}

impl PlatformPreferences {
    pub fn from_platforms(platforms: &[Platform]) -> Self {
        Self {
            github: platforms.contains(&Platform::GitHub),
            graphite: platforms.contains(&Platform::Graphite),
        }
    }

    /// Enabled platforms in link order.
    pub fn enabled(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        if self.github {
            platforms.push(Platform::GitHub);
        }
        if self.graphite {
            platforms.push(Platform::Graphite);
        }
        platforms
    }

    pub fn is_empty(&self) -> bool {
        !self.github && !self.graphite
    }
}

/// User preferences read by the copy pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionSettings {
    pub mode: Mode,
    pub platforms: PlatformPreferences,
    /// Personal access token for `user-token` mode; may be blank
    pub token: String,
    pub include_branch_name: bool,
}

/// Token-minting service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_key: None,
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Everything loaded from `.pr-copy.toml`.
///
/// All keys are optional and the tool works with no file at all. Each
/// setting is validated on its own: a malformed value falls back to its
/// default without discarding the rest of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub settings: ExtensionSettings,
    pub backend: BackendConfig,
    pub github: GitHubConfig,
    pub selectors: SelectorOverrides,
}

impl Config {
    /// Load from `path`, or `.pr-copy.toml` in the current directory, then
    /// apply environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config, ConfigError> {
        let table: Table = contents.parse()?;

        Ok(Config {
            settings: ExtensionSettings {
                mode: read_mode(&table),
                platforms: read_platforms(&table),
                token: read_token(&table),
                include_branch_name: read_include_branch_name(&table),
            },
            backend: read_section(&table, "backend"),
            github: read_section(&table, "github"),
            selectors: read_section(&table, "selectors"),
        })
    }

    /// `GITHUB_TOKEN` fills a blank token; `PR_COPY_API_BASE_URL` and
    /// `PR_COPY_API_KEY` override the backend section.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.settings.token.trim().is_empty() {
            if let Some(token) = lookup("GITHUB_TOKEN") {
                self.settings.token = token;
            }
        }
        if let Some(base_url) = lookup("PR_COPY_API_BASE_URL") {
            self.backend.base_url = base_url;
        }
        if let Some(api_key) = lookup("PR_COPY_API_KEY") {
            self.backend.api_key = Some(api_key);
        }
    }

    /// Store the four user settings, keeping every other section of the
    /// file as it is.
    pub fn save_settings(path: &Path, settings: &ExtensionSettings) -> Result<(), ConfigError> {
        if settings.platforms.is_empty() {
            return Err(ConfigError::NoPlatforms);
        }

        let mut table: Table = if path.exists() {
            fs::read_to_string(path)?.parse()?
        } else {
            Table::new()
        };

        let mut platforms = Table::new();
        platforms.insert("github".to_string(), Value::Boolean(settings.platforms.github));
        platforms.insert(
            "graphite".to_string(),
            Value::Boolean(settings.platforms.graphite),
        );

        table.insert(
            "mode".to_string(),
            Value::String(settings.mode.as_str().to_string()),
        );
        table.insert("token".to_string(), Value::String(settings.token.clone()));
        table.insert(
            "include_branch_name".to_string(),
            Value::Boolean(settings.include_branch_name),
        );
        table.insert("platforms".to_string(), Value::Table(platforms));

        fs::write(path, toml::to_string_pretty(&table)?)?;
        debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}

fn read_mode(table: &Table) -> Mode {
    match table.get("mode") {
        None => Mode::default(),
        Some(Value::String(raw)) => Mode::parse(raw).unwrap_or_else(|| {
            warn!(mode = %raw, "unknown mode in config, using default");
            Mode::default()
        }),
        Some(other) => {
            warn!(value = %other, "mode must be a string, using default");
            Mode::default()
        }
    }
}

/// Missing entries count as disabled. A non-boolean entry, or a table with
/// nothing enabled, falls back to the default (GitHub only).
fn read_platforms(table: &Table) -> PlatformPreferences {
    let Some(value) = table.get("platforms") else {
        return PlatformPreferences::default();
    };
    let Some(platforms) = value.as_table() else {
        warn!(value = %value, "platforms must be a table, using default");
        return PlatformPreferences::default();
    };

    let flag = |name: &str| match platforms.get(name) {
        None => Some(false),
        Some(Value::Boolean(enabled)) => Some(*enabled),
        Some(_) => None,
    };

    match (flag("github"), flag("graphite")) {
        (Some(github), Some(graphite)) if github || graphite => {
            PlatformPreferences { github, graphite }
        }
        (Some(_), Some(_)) => {
            warn!("no platform links enabled in config, using default");
            PlatformPreferences::default()
        }
        _ => {
            warn!("platform flags must be booleans, using default");
            PlatformPreferences::default()
        }
    }
}

fn read_token(table: &Table) -> String {
    match table.get("token") {
        None => String::new(),
        Some(Value::String(token)) => token.clone(),
        Some(_) => {
            warn!("token must be a string, ignoring it");
            String::new()
        }
    }
}

fn read_include_branch_name(table: &Table) -> bool {
    match table.get("include_branch_name") {
        None => false,
        Some(Value::Boolean(include)) => *include,
        Some(other) => {
            warn!(value = %other, "include_branch_name must be a boolean, using default");
            false
        }
    }
}

fn read_section<T>(table: &Table, name: &str) -> T
where
    T: Default + for<'de> Deserialize<'de>,
{
    match table.get(name) {
        None => T::default(),
        Some(value) => value.clone().try_into().unwrap_or_else(|err| {
            warn!(section = name, error = %err, "malformed config section, using defaults");
            T::default()
        }),
    }
}
