mod config;
mod copy;
mod inject;
mod pr;
mod scrape;
mod source;

use clap::{Parser, Subcommand};
use colored::Colorize;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use config::{Config, ExtensionSettings, Mode, PlatformPreferences, DEFAULT_CONFIG_FILE};
use copy::clipboard::{StdoutSink, SystemClipboard};
use copy::{copy_pull_request, ClipboardError, ClipboardSink, CopyError};
use inject::button::BUTTON_ID;
use inject::{ButtonState, CopyButton, Navigation, PageWatcher};
use pr::Platform;
use scrape::{Extractor, SelectorConfig};
use source::token_cache::SystemClock;
use source::{CurrentPage, Resolver};

/// PR Copy: copies a pull request's title and diff stats to the clipboard
/// as a short citation with links.
#[derive(Parser, Debug)]
#[command(name = "pr-copy", version, about)]
struct Cli {
    /// Settings file (defaults to .pr-copy.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy the citation for one pull request URL
    Copy {
        /// GitHub or Graphite pull request URL
        url: String,

        /// Saved page markup to scrape instead of downloading the URL
        #[arg(long)]
        page: Option<PathBuf>,

        /// Override the configured data source for this copy
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Print the plain-text citation to stdout instead of the clipboard
        #[arg(long)]
        print: bool,
    },

    /// Read page URLs and `copy` clicks from stdin, one per line
    Watch {
        /// Print citations to stdout instead of the clipboard
        #[arg(long)]
        print: bool,
    },

    /// Show the effective settings, or change them
    Settings {
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Personal access token for user-token mode (empty string clears it)
        #[arg(long)]
        token: Option<String>,

        /// Platform links to include; repeat for several
        #[arg(long = "platform", value_enum)]
        platforms: Vec<Platform>,

        #[arg(long)]
        include_branch_name: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Copy {
            url,
            page,
            mode,
            print,
        } => run_copy(config_path, &url, page.as_deref(), mode, print).await,
        Command::Watch { print } => run_watch(config_path, print).await,
        Command::Settings {
            mode,
            token,
            platforms,
            include_branch_name,
        } => run_settings(config_path, mode, token, &platforms, include_branch_name),
    }
}

async fn run_copy(
    config_path: Option<&Path>,
    raw_url: &str,
    page_file: Option<&Path>,
    mode: Option<Mode>,
    print: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let _main_span = info_span!("pr_copy", url = %raw_url).entered();

    info!("parsing PR URL");
    let (url, location) = pr::parse_pr_url(raw_url)?;
    debug!(owner = %location.owner, repo = %location.repo, number = location.number, "parsed PR URL");

    info!("loading configuration");
    let config = Config::load(config_path)?;
    let mut settings = config.settings.clone();
    if let Some(mode) = mode {
        settings.mode = mode;
    }

    let page = match page_file {
        Some(path) => CurrentPage::with_markup(url, tokio::fs::read_to_string(path).await?),
        None => CurrentPage::new(url),
    };

    let resolver = build_resolver(&config)?;
    let mut button = CopyButton::new(location);
    render_button(button.state());

    // The sink outlives the click so the clipboard stays owned through the reset delay.
    let mut sink_slot: Option<Box<dyn ClipboardSink>> = None;
    let slot = &mut sink_slot;
    let resolver = &resolver;
    let settings = &settings;
    let page = &page;
    let payload = button
        .press(
            |location| async move {
                let sink = slot.insert(open_sink(print)?);
                copy_pull_request(resolver, &location, settings, page, sink.as_mut()).await
            },
            render_button,
        )
        .await?;

    info!(chars = payload.text.len(), "done");
    Ok(())
}

async fn run_watch(config_path: Option<&Path>, print: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = Config::load(config_path)?;
    // One resolver for the whole session so minted tokens stay cached.
    let resolver = build_resolver(&config)?;
    let resolver = &resolver;

    let mut watcher = PageWatcher::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "quit" => break,
            "copy" => {
                let Some(page_url) = watcher.current_url().cloned() else {
                    warn!("no page loaded yet");
                    continue;
                };
                let Some(button) = watcher.button_mut() else {
                    warn!(url = %page_url, "no copy button on this page");
                    continue;
                };

                let span = info_span!("click", button = button.id(), url = %page_url);
                let result = button
                    .press(
                        |location| async move {
                            // Settings are read at click time so edits apply without a restart.
                            let settings = load_settings(config_path)?;
                            let page = CurrentPage::new(page_url);
                            let mut sink = open_sink(print)?;
                            copy_pull_request(resolver, &location, &settings, &page, sink.as_mut()).await
                        },
                        render_button,
                    )
                    .instrument(span)
                    .await;
                if let Err(err) = result {
                    eprintln!("{} {}", "error:".red().bold(), err);
                }
            }
            other => {
                let url = match Url::parse(other) {
                    Ok(url) => url,
                    Err(err) => {
                        warn!(line = other, error = %err, "ignoring input that is neither a command nor a URL");
                        continue;
                    }
                };
                match watcher.observe(&url) {
                    Navigation::Mounted(_) | Navigation::Retargeted(_) => {
                        if let Some(button) = watcher.button() {
                            let target = button.target();
                            eprintln!(
                                "{} on {}/{}",
                                button.id().dimmed(),
                                target.slug(),
                                target.number
                            );
                            render_button(button.state());
                        }
                    }
                    Navigation::Removed => eprintln!("{}", "button removed".dimmed()),
                    Navigation::Unchanged | Navigation::NotAPullRequest => {}
                }
            }
        }
    }

    info!("watch finished");
    Ok(())
}

fn run_settings(
    config_path: Option<&Path>,
    mode: Option<Mode>,
    token: Option<String>,
    platforms: &[Platform],
    include_branch_name: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let changing =
        mode.is_some() || token.is_some() || !platforms.is_empty() || include_branch_name.is_some();

    if changing {
        // Start from the file alone so environment overrides are never persisted.
        let mut settings = if path.exists() {
            Config::load_from(path)?.settings
        } else {
            ExtensionSettings::default()
        };
        if let Some(mode) = mode {
            settings.mode = mode;
        }
        if let Some(token) = token {
            settings.token = token.trim().to_string();
        }
        if !platforms.is_empty() {
            settings.platforms = PlatformPreferences::from_platforms(platforms);
        }
        if let Some(include) = include_branch_name {
            settings.include_branch_name = include;
        }
        Config::save_settings(path, &settings)?;
        info!(path = %path.display(), "settings saved");
    }

    let settings = Config::load(Some(path))?.settings;
    let enabled: Vec<&str> = settings
        .platforms
        .enabled()
        .into_iter()
        .map(Platform::label)
        .collect();
    println!("{:<20} {}", "mode".bold(), settings.mode);
    println!("{:<20} {}", "platforms".bold(), enabled.join(", "));
    println!("{:<20} {}", "token".bold(), mask_token(&settings.token));
    println!(
        "{:<20} {}",
        "include_branch_name".bold(),
        settings.include_branch_name
    );
    Ok(())
}

fn build_resolver(config: &Config) -> Result<Resolver, Box<dyn std::error::Error>> {
    let selectors = SelectorConfig::with_overrides(&config.selectors);
    let extractor = Arc::new(Extractor::new(&selectors)?);
    Ok(Resolver::from_config(config, extractor, Arc::new(SystemClock)))
}

fn load_settings(config_path: Option<&Path>) -> Result<ExtensionSettings, CopyError> {
    Config::load(config_path)
        .map(|config| config.settings)
        .map_err(|err| CopyError::Configuration(err.to_string()))
}

fn open_sink(print: bool) -> Result<Box<dyn ClipboardSink>, ClipboardError> {
    if print {
        Ok(Box::new(StdoutSink::new(std::io::stdout())))
    } else {
        Ok(Box::new(SystemClipboard::open()?))
    }
}

fn render_button(state: ButtonState) {
    let label = match state {
        ButtonState::Idle => state.label().bold(),
        ButtonState::Loading => state.label().yellow(),
        ButtonState::Success => state.label().green().bold(),
        ButtonState::Error => state.label().red().bold(),
    };
    let marker = if state.is_enabled() { "▶" } else { "…" };
    eprintln!("{} [{}] {}", marker.dimmed(), BUTTON_ID.dimmed(), label);
}

fn mask_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    format!("{visible}{}", "*".repeat(8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_copy_command() {
        let cli = Cli::try_parse_from([
            "pr-copy",
            "copy",
            "https://github.com/acme/widgets/pull/42",
            "--mode",
            "user-token",
            "--print",
        ])
        .unwrap();
        match cli.command {
            Command::Copy {
                url, mode, print, ..
            } => {
                assert_eq!(url, "https://github.com/acme/widgets/pull/42");
                assert_eq!(mode, Some(Mode::UserToken));
                assert!(print);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_settings_platforms() {
        let cli = Cli::try_parse_from([
            "pr-copy",
            "settings",
            "--platform",
            "github",
            "--platform",
            "graphite",
            "--include-branch-name",
            "true",
        ])
        .unwrap();
        match cli.command {
            Command::Settings {
                platforms,
                include_branch_name,
                ..
            } => {
                assert_eq!(platforms, vec![Platform::GitHub, Platform::Graphite]);
                assert_eq!(include_branch_name, Some(true));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "(not set)");
        assert_eq!(mask_token("ghp_abcdef123"), "ghp_********");
    }

    #[test]
    fn test_settings_command_persists_without_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pr-copy.toml");
        run_settings(
            Some(&path),
            Some(Mode::UserToken),
            Some(" ghp_saved ".to_string()),
            &[Platform::Graphite],
            Some(true),
        )
        .unwrap();

        let stored = Config::load_from(&path).unwrap().settings;
        assert_eq!(stored.mode, Mode::UserToken);
        assert_eq!(stored.token, "ghp_saved");
        assert!(!stored.platforms.github);
        assert!(stored.platforms.graphite);
        assert!(stored.include_branch_name);
    }
}
