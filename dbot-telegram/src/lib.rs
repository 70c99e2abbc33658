//! # dbot-telegram
//!
//! Telegram side of the dispatcher: the [`BotApi`] contract and its reqwest implementation,
//! environment configuration, the bounded [`UpdateQueue`], the polling and webhook ingestion
//! adapters, and the [`Dispatcher`] that drains the queue into handler-chain registries.

mod api;
mod config;
mod dispatcher;
mod lifecycle;
mod polling;
mod queue;
mod webhook;

pub use api::{BotApi, GetUpdatesParams, TelegramApi, WebhookInfo};
pub use config::{DispatcherConfig, PollingConfig, TelegramConfig, WebhookConfig, DEFAULT_API_URL};
pub use dispatcher::Dispatcher;
pub use lifecycle::{Lifecycle, LifecycleContext};
pub use polling::Poller;
pub use queue::{QueueClosed, UpdateQueue, UpdateSender};
pub use webhook::build_router;
