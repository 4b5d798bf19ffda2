//! ytnotify configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, YtNotifyError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

impl AppConfig {
    /// Load config from the default path (~/.ytnotify/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| YtNotifyError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| YtNotifyError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Reject configs the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            return Err(YtNotifyError::Config("telegram.bot_token is required".into()));
        }
        let secret = &self.telegram.webhook_secret;
        if secret.is_empty() || secret.len() > 256 {
            return Err(YtNotifyError::Config("telegram.webhook_secret is required (1-256 chars)".into()));
        }
        if !secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(YtNotifyError::Config(
                "telegram.webhook_secret may only contain A-Z, a-z, 0-9, _ and -".into(),
            ));
        }
        if self.youtube.api_key.is_empty() {
            return Err(YtNotifyError::Config("youtube.api_key is required".into()));
        }
        if self.gateway.public_url.is_empty() {
            return Err(YtNotifyError::Config("gateway.public_url is required".into()));
        }
        if self.scheduler.update_frequency_secs == 0 {
            return Err(YtNotifyError::Config("scheduler.update_frequency_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ytnotify home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ytnotify")
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used for hub and recorder callbacks.
    #[serde(default)]
    pub public_url: String,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8080 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: String::new(),
        }
    }
}

impl GatewayConfig {
    pub fn websub_callback(&self) -> String {
        format!("{}/websub", self.public_url.trim_end_matches('/'))
    }

    pub fn recorder_callback(&self) -> String {
        format!("{}/recorder", self.public_url.trim_end_matches('/'))
    }

    pub fn telegram_webhook(&self) -> String {
        format!("{}/telegram", self.public_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Sent back by Telegram in `X-Telegram-Bot-Api-Secret-Token`.
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String { "https://api.telegram.org".into() }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            webhook_secret: String::new(),
            api_base: default_telegram_api(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_youtube_api")]
    pub api_base: String,
}

fn default_youtube_api() -> String { "https://www.googleapis.com/youtube/v3".into() }

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_youtube_api(),
        }
    }
}

/// WebSub hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u64,
}

fn default_hub_url() -> String { "https://pubsubhubbub.appspot.com/subscribe".into() }
fn default_topic_prefix() -> String { "https://www.youtube.com/xml/feeds/videos.xml?channel_id=".into() }
fn default_lease_seconds() -> u64 { 432_000 }

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hub_url: default_hub_url(),
            topic_prefix: default_topic_prefix(),
            lease_seconds: default_lease_seconds(),
        }
    }
}

impl HubConfig {
    /// Renew at 90% of the lease.
    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs((self.lease_seconds * 9 / 10).max(60))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.ytnotify/ytnotify.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl DatabaseConfig {
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Polling cadence for the regular and diligent loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_update_frequency")]
    pub update_frequency_secs: u64,
    #[serde(default = "default_diligent_tick")]
    pub diligent_tick_secs: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: u64,
    #[serde(default = "default_tolerance_warn_every")]
    pub tolerance_warn_every_secs: u64,
    #[serde(default = "default_live_record_delay")]
    pub live_record_delay_secs: u64,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,
}

fn default_update_frequency() -> u64 { 3600 }
fn default_diligent_tick() -> u64 { 1 }
fn default_tolerance() -> u64 { 30 }
fn default_tolerance_warn_every() -> u64 { 1800 }
fn default_live_record_delay() -> u64 { 3 }
fn default_shutdown_grace() -> u64 { 5 }
fn default_api_timeout() -> u64 { 10 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_frequency_secs: default_update_frequency(),
            diligent_tick_secs: default_diligent_tick(),
            tolerance_secs: default_tolerance(),
            tolerance_warn_every_secs: default_tolerance_warn_every(),
            live_record_delay_secs: default_live_record_delay(),
            shutdown_grace_secs: default_shutdown_grace(),
            api_timeout_secs: default_api_timeout(),
        }
    }
}

impl SchedulerConfig {
    pub fn update_frequency(&self) -> Duration {
        Duration::from_secs(self.update_frequency_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_recorder_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_recorder_timeout() -> u64 { 5 }
fn default_retry_delay() -> u64 { 60 }

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_recorder_timeout(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}
