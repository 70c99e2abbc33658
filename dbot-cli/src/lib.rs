//! # dbot-cli
//!
//! Argument parsing, config loading and the demo bot wiring used by the `dbot` binary.

pub mod bot;
pub mod cli;

pub use bot::{allowed_users_from_env, build_dispatcher, EchoHandler};
pub use cli::{load_config, load_webhook_config, Cli, Commands};
