//! dbot CLI: run the demo bot in polling or webhook mode. Config from env and optional CLI args.

use anyhow::{Context, Result};
use clap::Parser;
use dbot_cli::{allowed_users_from_env, build_dispatcher, load_config, load_webhook_config, Cli, Commands};
use dbot_core::init_tracing;
use dbot_telegram::{DispatcherConfig, PollingConfig, TelegramApi, TelegramConfig};
use std::sync::Arc;
use storage::MemoryStorage;
use tracing::info;

fn dispatcher(config: &TelegramConfig) -> Result<dbot_telegram::Dispatcher> {
    init_tracing(config.log_file.as_deref())?;
    let api = Arc::new(TelegramApi::from_config(config).context("create Bot API client")?);
    let dispatcher_config = DispatcherConfig::from_env().context("load dispatcher config from env")?;
    info!(
        mode = %dispatcher_config.mode,
        queue_capacity = dispatcher_config.queue_capacity,
        "Dispatcher configured"
    );
    Ok(build_dispatcher(
        api,
        Arc::new(MemoryStorage::new()),
        dispatcher_config,
        allowed_users_from_env()?,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Polling { token } => {
            let config = load_config(token)?;
            let polling = PollingConfig::from_env().context("load polling config from env")?;
            let dp = Arc::new(dispatcher(&config)?);
            dp.start_polling(polling).await.context("polling stopped")
        }
        Commands::Webhook {
            token,
            address,
            path,
        } => {
            let config = load_config(token)?;
            let webhook = load_webhook_config(address, path)?;
            let dp = Arc::new(dispatcher(&config)?);
            dp.start_webhook(webhook).await.context("webhook server stopped")
        }
    }
}
