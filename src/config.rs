//! Runtime configuration, read from the process environment and an
//! optional `.env` file.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Dotenv file picked up from the working directory by [`Config::load`].
pub const ENV_FILE: &str = ".env";

/// Settings the binary needs at startup.
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token (`BOT_TOKEN`, required).
    pub bot_token: String,
    /// mail.tm API base URL (`MAILTM_BASE_URL`).
    pub mailtm_base_url: String,
    /// Telegram Bot API server (`TELEGRAM_API_URL`).
    pub telegram_api_url: String,
    /// Long-poll timeout for `getUpdates` (`POLL_TIMEOUT_SECS`).
    pub poll_timeout: Duration,
    /// Timeout for mail.tm requests (`HTTP_TIMEOUT_SECS`).
    pub http_timeout: Duration,
    /// Log level (`LOG_LEVEL`); ignored when `RUST_LOG` is set.
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("mailtm_base_url", &self.mailtm_base_url)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("http_timeout", &self.http_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment, filling gaps from `./.env`
    /// when that file exists.
    pub fn load() -> Result<Self> {
        let path = Path::new(ENV_FILE);
        if path.is_file() {
            Self::from_env_file(path)
        } else {
            Self::from_env()
        }
    }

    /// Load configuration from a dotenv file at `path`. Variables set in the
    /// process environment take precedence over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_and_lookup(path.as_ref(), |key| std::env::var(key).ok())
    }

    fn from_file_and_lookup<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = read_env_file(path)?;
        Self::from_lookup(|key| lookup(key).or_else(|| file.get(key).cloned()))
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = var("BOT_TOKEN")
            .ok_or_else(|| Error::Config("BOT_TOKEN is not set".to_string()))?;

        Ok(Self {
            bot_token,
            mailtm_base_url: var("MAILTM_BASE_URL")
                .unwrap_or_else(|| crate::client::BASE_URL.to_string()),
            telegram_api_url: var("TELEGRAM_API_URL")
                .unwrap_or_else(|| crate::telegram::API_URL.to_string()),
            poll_timeout: secs(var("POLL_TIMEOUT_SECS"), "POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
            http_timeout: secs(var("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let invalid = |err: dotenvy::Error| Error::Config(format!("{}: {err}", path.display()));
    dotenvy::from_path_iter(path)
        .map_err(invalid)?
        .map(|item| item.map_err(invalid))
        .collect()
}

fn secs(value: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(default));
    };
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config(format!("{key} must be a whole number of seconds, got `{raw}`")))
}
