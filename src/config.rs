use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::{default_feeds, FeedSpec};
use crate::client::HN_API_BASE;
use crate::keymap::KeyBindings;

const DEFAULT_ENV_PREFIX: &str = "HN_BROWSE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSpec>,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub keys: KeyBindings,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            feeds: default_feeds(),
            ui: UiConfig::default(),
            keys: KeyBindings::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    HN_API_BASE.to_string()
}

fn default_user_agent() -> String {
    format!("hn-browse/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    #[serde(default = "default_feed_window")]
    pub feed_window: usize,
    #[serde(default = "default_comment_window")]
    pub comment_window: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            feed_window: default_feed_window(),
            comment_window: default_comment_window(),
        }
    }
}

fn default_feed_window() -> usize {
    8
}

fn default_comment_window() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

/// Defaults, then the YAML file (explicit path or the default location),
/// then `<PREFIX>_<SECTION>__<KEY>` environment variables.
pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = match options.config_file.as_ref() {
        Some(path) => {
            ensure!(
                path.exists(),
                "config: file {} does not exist",
                path.display()
            );
            read_config_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => Config::default(),
        },
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    validate(&cfg)?;
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "ui.feed_window" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.feed_window = parsed;
            }
        }
        "ui.comment_window" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.comment_window = parsed;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.filter" => cfg.log.filter = value,
        "keys.advance" | "keys.retreat" | "keys.descend" | "keys.ascend" | "keys.quit"
        | "keys.open" => {
            let mut chars = value.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                match key {
                    "keys.advance" => cfg.keys.advance = ch,
                    "keys.retreat" => cfg.keys.retreat = ch,
                    "keys.descend" => cfg.keys.descend = ch,
                    "keys.ascend" => cfg.keys.ascend = ch,
                    "keys.quit" => cfg.keys.quit = ch,
                    _ => cfg.keys.open = ch,
                }
            }
        }
        _ => {}
    }
}

pub fn validate(cfg: &Config) -> Result<()> {
    Url::parse(&cfg.api.base_url)
        .with_context(|| format!("config: api.base_url {:?} is not a URL", cfg.api.base_url))?;
    ensure!(
        !cfg.api.user_agent.trim().is_empty(),
        "config: api.user_agent is required"
    );
    ensure!(cfg.ui.feed_window > 0, "config: ui.feed_window must be at least 1");
    ensure!(
        cfg.ui.comment_window > 0,
        "config: ui.comment_window must be at least 1"
    );
    ensure!(!cfg.feeds.is_empty(), "config: at least one feed is required");
    for feed in &cfg.feeds {
        ensure!(
            !feed.name.trim().is_empty() && !feed.endpoint.trim().is_empty(),
            "config: every feed needs a name and an endpoint"
        );
    }
    cfg.keys.validate()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hn-browse").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(path: Option<PathBuf>, prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: path,
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        validate(&cfg).unwrap();
        assert_eq!(cfg.ui.feed_window, 8);
        assert_eq!(cfg.ui.comment_window, 3);
        assert_eq!(cfg.feeds[0].name, "Top stories");
        assert_eq!(cfg.feeds[0].endpoint, "topstories.json");
        assert_eq!(cfg.api.timeout, Duration::from_secs(20));
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  timeout: 5s\nfeeds:\n  - name: Top asks\n    endpoint: askstories.json\nui:\n  comment_window: 5\nkeys:\n  advance: j\n  retreat: k\n",
        )
        .unwrap();
        let cfg = load(isolated(Some(path), "HN_BROWSE_TEST_FILE")).unwrap();
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.api.base_url, HN_API_BASE);
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.ui.comment_window, 5);
        assert_eq!(cfg.ui.feed_window, 8);
        assert_eq!(cfg.keys.advance, 'j');
        assert_eq!(cfg.keys.quit, 'q');
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(load(isolated(Some(path), "HN_BROWSE_TEST_MISSING")).is_err());
    }

    #[test]
    fn env_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "ui:\n  comment_window: 5\n").unwrap();
        env::set_var("HN_BROWSE_TEST_ENV_UI__FEED_WINDOW", "12");
        env::set_var("HN_BROWSE_TEST_ENV_KEYS__QUIT", "x");
        let cfg = load(isolated(Some(path), "HN_BROWSE_TEST_ENV")).unwrap();
        env::remove_var("HN_BROWSE_TEST_ENV_UI__FEED_WINDOW");
        env::remove_var("HN_BROWSE_TEST_ENV_KEYS__QUIT");
        assert_eq!(cfg.ui.feed_window, 12);
        assert_eq!(cfg.ui.comment_window, 5);
        assert_eq!(cfg.keys.quit, 'x');
    }

    #[test]
    fn rejects_zero_window() {
        let mut cfg = Config::default();
        cfg.ui.feed_window = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_empty_catalog() {
        let cfg = Config {
            feeds: Vec::new(),
            ..Config::default()
        };
        assert!(validate(&cfg).is_err());
    }
}
