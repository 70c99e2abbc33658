//! CLI parser and config loading.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbot_telegram::{TelegramConfig, WebhookConfig};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "dbot")]
#[command(about = "Telegram update dispatcher demo bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Long-poll getUpdates (polling settings from POLL_* env vars).
    Polling {
        /// Overrides BOT_TOKEN.
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Serve a webhook endpoint (settings from WEBHOOK_* env vars, overridable here).
    Webhook {
        #[arg(short, long)]
        token: Option<String>,
        /// Bind address, e.g. 0.0.0.0:8080.
        #[arg(short, long)]
        address: Option<SocketAddr>,
        /// Route path, e.g. /webhook.
        #[arg(short, long)]
        path: Option<String>,
    },
}

/// Loads TelegramConfig from environment. If `token` is provided it overrides BOT_TOKEN.
pub fn load_config(token: Option<String>) -> Result<TelegramConfig> {
    match token {
        Some(token) => {
            let mut config = TelegramConfig::with_token(token);
            if let Ok(url) = std::env::var("TELEGRAM_API_URL") {
                config.api_url = url;
            }
            config.log_file = std::env::var("LOG_FILE").ok();
            config.validate().context("invalid Telegram config")?;
            Ok(config)
        }
        None => TelegramConfig::from_env().context("load Telegram config from env (BOT_TOKEN)"),
    }
}

/// WebhookConfig from environment with CLI overrides applied.
pub fn load_webhook_config(address: Option<SocketAddr>, path: Option<String>) -> Result<WebhookConfig> {
    let mut config = WebhookConfig::from_env().context("load webhook config from env")?;
    if let Some(address) = address {
        config.address = address;
    }
    if let Some(path) = path {
        config.path = path;
    }
    config.validate().context("invalid webhook config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_webhook_args() {
        let cli = Cli::parse_from([
            "dbot",
            "webhook",
            "--token",
            "t",
            "--address",
            "127.0.0.1:9000",
            "--path",
            "/hook",
        ]);
        match cli.command {
            Commands::Webhook {
                token,
                address,
                path,
            } => {
                assert_eq!(token.as_deref(), Some("t"));
                assert_eq!(address, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(path.as_deref(), Some("/hook"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_token_argument_overrides_env() {
        std::env::set_var("BOT_TOKEN", "from-env");
        std::env::remove_var("TELEGRAM_API_URL");
        let config = load_config(Some("from-cli".to_string())).unwrap();
        assert_eq!(config.bot_token, "from-cli");

        let config = load_config(None).unwrap();
        assert_eq!(config.bot_token, "from-env");
        std::env::remove_var("BOT_TOKEN");
    }

    #[test]
    #[serial]
    fn test_webhook_overrides_are_validated() {
        std::env::remove_var("WEBHOOK_PATH");
        assert!(load_webhook_config(None, Some("no-slash".to_string())).is_err());
        let config = load_webhook_config(None, Some("/tg".to_string())).unwrap();
        assert_eq!(config.path, "/tg");
    }
}
