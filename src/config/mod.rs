// src/config/mod.rs
//! Process settings: optional TOML file, then environment overrides.

pub mod credentials;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::FeedRegistry;
use crate::notify::fcm::DEFAULT_FCM_BASE_URL;
use crate::notify::AlertTemplate;

pub const ENV_CONFIG_PATH: &str = "QUAKES_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/quakes.toml";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub poll_interval_secs: u64,
    pub alert: AlertTemplate,
    /// Client-wide timeout; `None` leaves requests unbounded.
    pub http_timeout_secs: Option<u64>,
    pub metrics_enabled: bool,
    pub notify_dry_run: bool,
    pub fcm_base_url: String,
    pub feeds: FeedRegistry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            alert: AlertTemplate::default(),
            http_timeout_secs: None,
            metrics_enabled: false,
            notify_dry_run: false,
            fcm_base_url: DEFAULT_FCM_BASE_URL.to_string(),
            feeds: FeedRegistry::default(),
        }
    }
}

/// On-disk shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    port: Option<u16>,
    poll_interval_secs: Option<u64>,
    alert_topic: Option<String>,
    alert_title: Option<String>,
    http_timeout_secs: Option<u64>,
    metrics_enabled: Option<bool>,
    notify_dry_run: Option<bool>,
    fcm_base_url: Option<String>,
    feeds: Option<FeedRegistry>,
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Load using env var + fallbacks:
    /// 1) $QUAKES_CONFIG_PATH (must exist)
    /// 2) config/quakes.toml (if present)
    /// 3) built-in defaults
    ///
    /// Environment variables then override whatever the file set.
    pub fn load() -> Result<Self> {
        let mut settings = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::from_file(&pb)?
            }
            Err(_) => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::from_file(&fallback)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let file: FileSettings = toml::from_str(s)?;
        let mut out = Self::default();
        if let Some(v) = file.port {
            out.port = v;
        }
        if let Some(v) = file.poll_interval_secs {
            out.poll_interval_secs = v;
        }
        if let Some(v) = file.alert_topic {
            out.alert.topic = v;
        }
        if let Some(v) = file.alert_title {
            out.alert.title = v;
        }
        out.http_timeout_secs = file.http_timeout_secs.or(out.http_timeout_secs);
        if let Some(v) = file.metrics_enabled {
            out.metrics_enabled = v;
        }
        if let Some(v) = file.notify_dry_run {
            out.notify_dry_run = v;
        }
        if let Some(v) = file.fcm_base_url {
            out.fcm_base_url = v;
        }
        if let Some(v) = file.feeds {
            out.feeds = v;
        }
        Ok(out)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<u16>("PORT")? {
            self.port = v;
        }
        if let Some(v) = env_parse::<u64>("POLL_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_string("ALERT_TOPIC") {
            self.alert.topic = v;
        }
        if let Some(v) = env_string("ALERT_TITLE") {
            self.alert.title = v;
        }
        if let Some(v) = env_parse::<u64>("HTTP_TIMEOUT_SECS")? {
            self.http_timeout_secs = Some(v);
        }
        if let Some(v) = env_flag("METRICS_ENABLED") {
            self.metrics_enabled = v;
        }
        if let Some(v) = env_flag("NOTIFY_DRY_RUN") {
            self.notify_dry_run = v;
        }
        if let Some(v) = env_string("FCM_BASE_URL") {
            self.fcm_base_url = v;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(anyhow!("poll interval must be at least 1 second"));
        }
        if self.alert.topic.trim().is_empty() {
            return Err(anyhow!("alert topic must not be empty"));
        }
        Ok(())
    }

    /// Shared HTTP client for the feed and the push sender.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("quake-alerts/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = self.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("building HTTP client")
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {name}={raw:?}: {e}")),
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env_string(name).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
