use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    /// Defaults to the OAuth host when a token is configured.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_near_threshold_ratio")]
    pub near_threshold_ratio: f64,
    #[serde(default = "default_near_threshold_hours")]
    pub near_threshold_hours: u32,
    #[serde(default = "default_refresh_hours")]
    pub default_refresh_hours: u32,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    #[serde(default = "default_wiki_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_list_pages")]
    pub list_pages: Vec<String>,
    #[serde(default = "default_report_page")]
    pub report_page: String,
    #[serde(default)]
    pub listing_page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_loop_secs")]
    pub loop_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub threshold: Option<i64>,
    pub user_agent: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be positive, got {0}")]
    Threshold(i64),
    #[error("near_threshold_ratio must be in [0, 1), got {0}")]
    NearThresholdRatio(f64),
    #[error("user_agent must not be empty")]
    UserAgent,
    #[error("wiki subreddit must not be empty")]
    WikiSubreddit,
    #[error("at least one wiki list page is required")]
    ListPages,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/subreddit-tracker/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(threshold) = overrides.threshold {
            self.tracking.threshold = threshold;
        }
        if let Some(user_agent) = overrides.user_agent {
            self.reddit.user_agent = user_agent;
        }
        if let Some(token) = overrides.access_token {
            self.reddit.access_token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracking.threshold <= 0 {
            return Err(ConfigError::Threshold(self.tracking.threshold));
        }
        let ratio = self.tracking.near_threshold_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::NearThresholdRatio(ratio));
        }
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::UserAgent);
        }
        if self.wiki.subreddit.trim().is_empty() {
            return Err(ConfigError::WikiSubreddit);
        }
        if self.wiki.list_pages.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::ListPages);
        }
        Ok(())
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn has_token(&self) -> bool {
        !self.reddit.access_token.trim().is_empty()
    }

    pub fn resolved_base_url(&self) -> String {
        match &self.reddit.base_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ if self.has_token() => "https://oauth.reddit.com".to_string(),
            _ => "https://www.reddit.com".to_string(),
        }
    }

    pub fn default_template() -> String {
        let template = r#"[reddit]
user_agent = "ListOfSubreddits helper (by /u/YourUsername)"
access_token = ""
request_timeout_secs = 20

[storage]
db_path = "~/.local/share/subreddit-tracker/database.db"

[tracking]
threshold = 50000
near_threshold_ratio = 0.05
near_threshold_hours = 4
default_refresh_hours = 24
sample_limit = 1000

[wiki]
subreddit = "ListOfSubreddits"
list_pages = ["listofsubreddits"]
report_page = "addremovesubreddits"
# listing_page = "fulllist"

[run]
loop_secs = 3600
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: default_user_agent(),
            access_token: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            near_threshold_ratio: default_near_threshold_ratio(),
            near_threshold_hours: default_near_threshold_hours(),
            default_refresh_hours: default_refresh_hours(),
            sample_limit: default_sample_limit(),
        }
    }
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            subreddit: default_wiki_subreddit(),
            list_pages: default_list_pages(),
            report_page: default_report_page(),
            listing_page: None,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            loop_secs: default_loop_secs(),
        }
    }
}

fn default_user_agent() -> String {
    format!("subreddit-tracker/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_db_path() -> String {
    "~/.local/share/subreddit-tracker/database.db".to_string()
}

fn default_threshold() -> i64 {
    50_000
}

fn default_near_threshold_ratio() -> f64 {
    0.05
}

fn default_near_threshold_hours() -> u32 {
    4
}

fn default_refresh_hours() -> u32 {
    24
}

fn default_sample_limit() -> usize {
    1000
}

fn default_wiki_subreddit() -> String {
    "ListOfSubreddits".to_string()
}

fn default_list_pages() -> Vec<String> {
    vec!["listofsubreddits".to_string()]
}

fn default_report_page() -> String {
    "addremovesubreddits".to_string()
}

fn default_loop_secs() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigError, ConfigOverrides};

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("parse template");
        assert_eq!(parsed.tracking.threshold, 50_000);
        assert_eq!(parsed.tracking.sample_limit, 1000);
        assert_eq!(parsed.wiki.list_pages, vec!["listofsubreddits".to_string()]);
        assert_eq!(parsed.wiki.listing_page, None);
        assert_eq!(parsed.run.loop_secs, 3600);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.wiki.report_page, "addremovesubreddits");
        assert_eq!(config.resolved_base_url(), "https://www.reddit.com");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nthreshold = 1000\n").expect("write config");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.tracking.threshold, 1000);
        assert_eq!(config.tracking.default_refresh_hours, 24);
    }

    #[test]
    fn overrides_win_and_token_switches_host() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            threshold: Some(10),
            access_token: Some("abc".to_string()),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.tracking.threshold, 10);
        assert_eq!(config.resolved_base_url(), "https://oauth.reddit.com");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.tracking.threshold = 0;
        assert_eq!(config.validate(), Err(ConfigError::Threshold(0)));

        let mut config = Config::default();
        config.wiki.list_pages = vec![" ".to_string()];
        assert_eq!(config.validate(), Err(ConfigError::ListPages));

        let mut config = Config::default();
        config.tracking.near_threshold_ratio = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::NearThresholdRatio(1.5)));
    }
}
