//! Demo bot: an echo conversation driven by FSM state, plus stock middleware and lifecycle logs.
//!
//! `/start` enters echo mode, every text is echoed back while in it, `/stop` leaves it and
//! reports how many messages were echoed.

use async_trait::async_trait;
use dbot_core::{CallbackQuery, ChatMemberUpdated, Message, State, Storage};
use dbot_telegram::{BotApi, Dispatcher, DispatcherConfig};
use handler_chain::{Context, Handler, HandlerResult, MiddlewareStage};
use middleware::{AuthMiddleware, LoggingMiddleware};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub fn echo_state() -> State {
    State::new("Echo", "active")
}

pub struct EchoHandler {
    api: Arc<dyn BotApi>,
}

impl EchoHandler {
    pub fn new(api: Arc<dyn BotApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Handler<Message> for EchoHandler {
    async fn handle(&self, message: Message, ctx: Context) -> HandlerResult {
        let Some(text) = message.text_or_caption() else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        match text.trim() {
            "/start" => {
                ctx.set_state(&echo_state()).await?;
                ctx.update_data("echoed", json!(0)).await?;
                self.api
                    .send_message(chat_id, "Echo mode on. Send /stop to leave.")
                    .await?;
            }
            "/stop" => {
                let echoed = ctx
                    .data()
                    .await?
                    .get("echoed")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                ctx.finish().await?;
                self.api
                    .send_message(chat_id, &format!("Echo mode off after {} messages.", echoed))
                    .await?;
            }
            _ if ctx.in_state(&echo_state()).await? => {
                let echoed = ctx
                    .data()
                    .await?
                    .get("echoed")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                self.api.send_message(chat_id, text).await?;
                ctx.update_data("echoed", json!(echoed + 1)).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Comma-separated user ids from `ALLOWED_USERS`; `None` when unset or empty.
pub fn allowed_users_from_env() -> anyhow::Result<Option<Vec<i64>>> {
    let Ok(raw) = std::env::var("ALLOWED_USERS") else {
        return Ok(None);
    };
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| anyhow::anyhow!("ALLOWED_USERS has invalid id {:?}: {}", s, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((!ids.is_empty()).then_some(ids))
}

/// Dispatcher with logging on every stage, the optional allowlist gate, the echo handler and
/// lifecycle log hooks.
pub fn build_dispatcher(
    api: Arc<dyn BotApi>,
    storage: Arc<dyn Storage>,
    config: DispatcherConfig,
    allowed_users: Option<Vec<i64>>,
) -> Dispatcher {
    let mut dp = Dispatcher::new(api.clone(), storage, config);

    let logging = Arc::new(LoggingMiddleware);
    for stage in MiddlewareStage::ALL {
        dp.add_global_middleware(stage, logging.clone());
    }
    if let Some(users) = allowed_users {
        info!(count = users.len(), "Allowlist enabled");
        dp.add_global_middleware(MiddlewareStage::Process, Arc::new(AuthMiddleware::new(users)));
    }

    dp.register_message_handler(EchoHandler::new(api))
        .register_callback_query_handler(|query: CallbackQuery, _ctx: Context| async move {
            info!(query_id = %query.id, data = query.data.as_deref().unwrap_or(""), "Callback query");
            Ok::<(), anyhow::Error>(())
        })
        .register_my_chat_member_handler(|update: ChatMemberUpdated, _ctx: Context| async move {
            info!(
                chat_id = update.chat.id,
                status = %update.new_chat_member.status,
                "Bot membership changed"
            );
            Ok::<(), anyhow::Error>(())
        })
        .on_startup(|ctx| async move {
            let me = ctx.api.get_me().await?;
            info!(username = me.username.as_deref().unwrap_or(""), "Bot starting up");
            Ok::<(), anyhow::Error>(())
        })
        .on_shutdown(|_ctx| async {
            info!("Bot shut down");
            Ok::<(), anyhow::Error>(())
        });
    dp
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbot_core::{Chat, Result, Update, User};
    use dbot_telegram::{GetUpdatesParams, WebhookInfo};
    use serial_test::serial;
    use std::sync::Mutex;
    use storage::MemoryStorage;

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn get_updates(&self, _params: &GetUpdatesParams) -> Result<Vec<Update>> {
            Ok(Vec::new())
        }
        async fn delete_webhook(&self, _drop_pending_updates: bool) -> Result<()> {
            Ok(())
        }
        async fn get_webhook_info(&self) -> Result<WebhookInfo> {
            Ok(WebhookInfo::default())
        }
        async fn set_webhook(&self, _url: &str, _allowed_updates: &[String]) -> Result<()> {
            Ok(())
        }
        async fn get_me(&self) -> Result<User> {
            Ok(user(1))
        }
        async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(message(0, 1, chat_id, text))
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            is_bot: false,
            first_name: "U".to_string(),
            last_name: None,
            username: None,
        }
    }

    fn message(message_id: i64, user_id: i64, chat_id: i64, text: &str) -> Message {
        Message {
            message_id,
            from: Some(user(user_id)),
            sender_chat: None,
            chat: Chat {
                id: chat_id,
                chat_type: "private".to_string(),
                title: None,
                username: None,
            },
            date: 0,
            text: Some(text.to_string()),
            caption: None,
        }
    }

    fn text_update(update_id: i64, user_id: i64, text: &str) -> Update {
        let mut update = Update::new(update_id);
        update.message = Some(message(update_id, user_id, 10, text));
        update
    }

    #[tokio::test]
    async fn test_echo_conversation() {
        let api = Arc::new(RecordingApi::default());
        let store = MemoryStorage::new();
        let dp = build_dispatcher(api.clone(), Arc::new(store.clone()), DispatcherConfig::default(), None);

        for (id, text) in [(1, "ignored"), (2, "/start"), (3, "one"), (4, "two"), (5, "/stop"), (6, "after")] {
            dp.process_update(text_update(id, 20, text)).await.unwrap();
        }

        let sent: Vec<String> = api.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(
            sent,
            vec![
                "Echo mode on. Send /stop to leave.",
                "one",
                "two",
                "Echo mode off after 2 messages.",
            ]
        );
        assert_eq!(store.get_state(10, 20).await.unwrap(), "");
        assert!(store.get_data(10, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allowlist_blocks_other_users() {
        let api = Arc::new(RecordingApi::default());
        let dp = build_dispatcher(
            api.clone(),
            Arc::new(MemoryStorage::new()),
            DispatcherConfig::default(),
            Some(vec![20]),
        );

        dp.process_update(text_update(1, 99, "/start")).await.unwrap();
        assert!(api.sent.lock().unwrap().is_empty());

        dp.process_update(text_update(2, 20, "/start")).await.unwrap();
        assert_eq!(api.sent.lock().unwrap().len(), 1);
    }

    #[test]
    #[serial]
    fn test_allowed_users_from_env() {
        std::env::remove_var("ALLOWED_USERS");
        assert_eq!(allowed_users_from_env().unwrap(), None);

        std::env::set_var("ALLOWED_USERS", "1, 2,3");
        assert_eq!(allowed_users_from_env().unwrap(), Some(vec![1, 2, 3]));

        std::env::set_var("ALLOWED_USERS", "1,x");
        assert!(allowed_users_from_env().is_err());
        std::env::remove_var("ALLOWED_USERS");
    }
}
