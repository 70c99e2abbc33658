//! Runtime configuration loaded from environment variables.
//!
//! Call `dotenvy::dotenv()` before `from_env` to pick up a `.env` file. Unset variables fall back
//! to the [`Default`] values; set but unparsable ones are a [`DbotError::Config`].

use dbot_core::{DbotError, ExecutionMode, Result};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| DbotError::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(DbotError::Config(format!(
                "{} must be a boolean (1/0/true/false/yes/no), got {:?}",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}

/// Bot API access and log destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
    pub log_file: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            log_file: None,
        }
    }
}

impl TelegramConfig {
    /// BOT_TOKEN is required; TELEGRAM_API_URL and LOG_FILE are optional.
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env_var("BOT_TOKEN").ok_or_else(|| DbotError::Config("BOT_TOKEN not set".to_string()))?;
        let config = Self {
            bot_token,
            api_url: env_var("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            log_file: env_var("LOG_FILE"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(DbotError::Config("bot token is empty".to_string()));
        }
        if reqwest::Url::parse(&self.api_url).is_err() {
            return Err(DbotError::Config(format!(
                "TELEGRAM_API_URL is not a valid URL: {}",
                self.api_url
            )));
        }
        Ok(())
    }
}

/// Polling adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Pause before each poll request; zero disables it.
    pub relax: Duration,
    /// Pause after a failed poll request.
    pub error_sleep: Duration,
    /// Remote long-poll timeout in seconds.
    pub timeout_secs: u32,
    /// Maximum updates per batch, 1..=100.
    pub limit: u32,
    /// Initial offset cursor.
    pub offset: i64,
    /// Drop updates that are pending at start.
    pub skip_updates: bool,
    /// Delete a registered webhook before polling (polling fails while one is set).
    pub reset_webhook: bool,
    /// Install the Ctrl-C graceful shutdown handler.
    pub safe_exit: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            relax: Duration::from_millis(1000),
            error_sleep: Duration::from_secs(5),
            timeout_secs: 20,
            limit: 100,
            offset: 0,
            skip_updates: false,
            reset_webhook: false,
            safe_exit: true,
        }
    }
}

impl PollingConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let config = Self {
            relax: Duration::from_millis(env_parse("POLL_RELAX_MS", d.relax.as_millis() as u64)?),
            error_sleep: Duration::from_secs(env_parse(
                "POLL_ERROR_SLEEP_SECS",
                d.error_sleep.as_secs(),
            )?),
            timeout_secs: env_parse("POLL_TIMEOUT_SECS", d.timeout_secs)?,
            limit: env_parse("POLL_LIMIT", d.limit)?,
            offset: env_parse("POLL_OFFSET", d.offset)?,
            skip_updates: env_bool("SKIP_UPDATES", d.skip_updates)?,
            reset_webhook: env_bool("RESET_WEBHOOK", d.reset_webhook)?,
            safe_exit: env_bool("SAFE_EXIT", d.safe_exit)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.limit) {
            return Err(DbotError::Config(format!(
                "POLL_LIMIT must be between 1 and 100, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Webhook adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub address: SocketAddr,
    /// Route the update endpoint is mounted on; starts with `/`.
    pub path: String,
    /// Public URL registered with `setWebhook` on start, if set.
    pub url: Option<String>,
    pub safe_exit: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            path: "/webhook".to_string(),
            url: None,
            safe_exit: true,
        }
    }
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let config = Self {
            address: env_parse("WEBHOOK_ADDRESS", d.address)?,
            path: env_var("WEBHOOK_PATH").unwrap_or(d.path),
            url: env_var("WEBHOOK_URL"),
            safe_exit: env_bool("SAFE_EXIT", d.safe_exit)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(DbotError::Config(format!(
                "WEBHOOK_PATH must start with '/', got {:?}",
                self.path
            )));
        }
        if let Some(url) = &self.url {
            if reqwest::Url::parse(url).is_err() {
                return Err(DbotError::Config(format!("WEBHOOK_URL is not a valid URL: {}", url)));
            }
        }
        Ok(())
    }
}

/// Engine-wide dispatch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub mode: ExecutionMode,
    /// Bounded queue size between the adapters and the dispatch loop.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Synchronous,
            queue_capacity: 100,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let config = Self {
            mode: env_parse("DISPATCH_MODE", d.mode)?,
            queue_capacity: env_parse("UPDATE_QUEUE_CAPACITY", d.queue_capacity)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(DbotError::Config(
                "UPDATE_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "BOT_TOKEN",
        "TELEGRAM_API_URL",
        "LOG_FILE",
        "POLL_RELAX_MS",
        "POLL_ERROR_SLEEP_SECS",
        "POLL_TIMEOUT_SECS",
        "POLL_LIMIT",
        "POLL_OFFSET",
        "SKIP_UPDATES",
        "RESET_WEBHOOK",
        "SAFE_EXIT",
        "WEBHOOK_ADDRESS",
        "WEBHOOK_PATH",
        "WEBHOOK_URL",
        "DISPATCH_MODE",
        "UPDATE_QUEUE_CAPACITY",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_telegram_config_requires_token() {
        clear_env();
        assert!(matches!(TelegramConfig::from_env(), Err(DbotError::Config(_))));

        env::set_var("BOT_TOKEN", "123:abc");
        let config = TelegramConfig::from_env().unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.log_file.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_telegram_config_rejects_invalid_url() {
        clear_env();
        env::set_var("BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_API_URL", "not a url");
        assert!(TelegramConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_is_empty() {
        clear_env();
        assert_eq!(PollingConfig::from_env().unwrap(), PollingConfig::default());
        assert_eq!(WebhookConfig::from_env().unwrap(), WebhookConfig::default());
        assert_eq!(DispatcherConfig::from_env().unwrap(), DispatcherConfig::default());
    }

    #[test]
    #[serial]
    fn test_polling_config_from_env() {
        clear_env();
        env::set_var("POLL_RELAX_MS", "0");
        env::set_var("POLL_TIMEOUT_SECS", "30");
        env::set_var("POLL_LIMIT", "50");
        env::set_var("POLL_OFFSET", "42");
        env::set_var("SKIP_UPDATES", "yes");
        env::set_var("SAFE_EXIT", "0");

        let config = PollingConfig::from_env().unwrap();
        assert!(config.relax.is_zero());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.limit, 50);
        assert_eq!(config.offset, 42);
        assert!(config.skip_updates);
        assert!(!config.reset_webhook);
        assert!(!config.safe_exit);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_config_errors() {
        clear_env();
        env::set_var("POLL_LIMIT", "101");
        assert!(PollingConfig::from_env().is_err());
        env::set_var("POLL_LIMIT", "ten");
        assert!(PollingConfig::from_env().is_err());
        clear_env();

        env::set_var("SKIP_UPDATES", "maybe");
        assert!(PollingConfig::from_env().is_err());
        clear_env();

        env::set_var("WEBHOOK_PATH", "webhook");
        assert!(WebhookConfig::from_env().is_err());
        clear_env();

        env::set_var("UPDATE_QUEUE_CAPACITY", "0");
        assert!(DispatcherConfig::from_env().is_err());
        env::set_var("UPDATE_QUEUE_CAPACITY", "10");
        env::set_var("DISPATCH_MODE", "parallel");
        assert!(DispatcherConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_dispatcher_and_webhook_config_from_env() {
        clear_env();
        env::set_var("DISPATCH_MODE", "async");
        env::set_var("UPDATE_QUEUE_CAPACITY", "1");
        env::set_var("WEBHOOK_ADDRESS", "127.0.0.1:9000");
        env::set_var("WEBHOOK_PATH", "/tg");
        env::set_var("WEBHOOK_URL", "https://example.com/tg");

        let dispatcher = DispatcherConfig::from_env().unwrap();
        assert_eq!(dispatcher.mode, ExecutionMode::Asynchronous);
        assert_eq!(dispatcher.queue_capacity, 1);

        let webhook = WebhookConfig::from_env().unwrap();
        assert_eq!(webhook.address, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(webhook.path, "/tg");
        assert_eq!(webhook.url.as_deref(), Some("https://example.com/tg"));
        clear_env();
    }
}
