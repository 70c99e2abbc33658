//! Remote Bot API contract and its HTTP implementation.
//!
//! The dispatcher and adapters only see [`BotApi`]; [`TelegramApi`] speaks the Telegram Bot API
//! over reqwest (`POST {api_url}/bot{token}/{method}` with a JSON body).

use async_trait::async_trait;
use dbot_core::{DbotError, Message, Result, Update, User};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::TelegramConfig;

/// Extra time on top of the long-poll timeout before the HTTP request itself gives up.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Parameters of a `getUpdates` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetUpdatesParams {
    pub offset: i64,
    pub limit: u32,
    /// Long-poll timeout in seconds; 0 returns immediately.
    pub timeout: u32,
    pub allowed_updates: Vec<String>,
}

/// Result of `getWebhookInfo`; `url` is empty when no webhook is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    pub last_error_message: Option<String>,
}

/// Remote calls the engine depends on.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Fetches pending updates. Updates below `params.offset` may be redelivered.
    async fn get_updates(&self, params: &GetUpdatesParams) -> Result<Vec<Update>>;

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()>;

    async fn get_webhook_info(&self) -> Result<WebhookInfo>;

    async fn set_webhook(&self, url: &str, allowed_updates: &[String]) -> Result<()>;

    async fn get_me(&self) -> Result<User>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message>;
}

#[derive(Deserialize)]
struct ApiResponse<R> {
    ok: bool,
    result: Option<R>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// [`BotApi`] over HTTPS.
#[derive(Clone)]
pub struct TelegramApi {
    client: Client,
    api_url: String,
    token: String,
}

impl TelegramApi {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        reqwest::Url::parse(&api_url)
            .map_err(|e| DbotError::Config(format!("invalid Bot API url {}: {}", api_url, e)))?;
        let client = Client::builder()
            .build()
            .map_err(|e| DbotError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url,
            token: token.into(),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        Self::new(config.bot_token.clone(), config.api_url.clone())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(method, "Bot API request");
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DbotError::Transport(format!("{}: {}", method, e.without_url())))?;
        let status = response.status();
        let body: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| DbotError::Transport(format!("{}: {}", method, e.without_url())))?;

        if !body.ok {
            return Err(DbotError::Api {
                code: body.error_code.unwrap_or(i64::from(status.as_u16())),
                description: body.description.unwrap_or_default(),
            });
        }
        body.result
            .ok_or_else(|| DbotError::Transport(format!("{}: response has no result", method)))
    }
}

impl fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramApi")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BotApi for TelegramApi {
    #[instrument(skip(self), fields(offset = params.offset))]
    async fn get_updates(&self, params: &GetUpdatesParams) -> Result<Vec<Update>> {
        let timeout = Duration::from_secs(u64::from(params.timeout)) + LONG_POLL_GRACE;
        self.call("getUpdates", params, Some(timeout)).await
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &json!({ "drop_pending_updates": drop_pending_updates }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        self.call("getWebhookInfo", &json!({}), None).await
    }

    async fn set_webhook(&self, url: &str, allowed_updates: &[String]) -> Result<()> {
        let _: bool = self
            .call(
                "setWebhook",
                &json!({ "url": url, "allowed_updates": allowed_updates }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({}), None).await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message> {
        self.call(
            "sendMessage",
            &json!({ "chat_id": chat_id, "text": text }),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let api = TelegramApi::new("123:abc", "https://api.telegram.org/").unwrap();
        assert_eq!(
            api.method_url("getMe"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = TelegramApi::new("t", "not a url").unwrap_err();
        assert!(matches!(err, DbotError::Config(_)));
    }

    #[test]
    fn test_debug_hides_token() {
        let api = TelegramApi::new("secret-token", "https://api.telegram.org").unwrap();
        assert!(!format!("{:?}", api).contains("secret-token"));
    }
}
