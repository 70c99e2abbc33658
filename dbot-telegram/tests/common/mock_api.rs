//! Scripted [`BotApi`] for tests: replays queued poll batches and records every call.

use async_trait::async_trait;
use dbot_core::{DbotError, Message, Result, Update, User};
use dbot_telegram::{BotApi, GetUpdatesParams, WebhookInfo};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{private_chat, user};

#[derive(Default)]
pub struct MockBotApi {
    batches: Mutex<VecDeque<Result<Vec<Update>>>>,
    pending: Mutex<Vec<Update>>,
    webhook_url: Mutex<String>,
    pub poll_calls: Mutex<Vec<GetUpdatesParams>>,
    pub delete_webhook_calls: AtomicUsize,
    pub set_webhook_calls: Mutex<Vec<String>>,
    pub get_me_calls: AtomicUsize,
    /// When set, `getMe` answers with an API error.
    pub fail_get_me: AtomicBool,
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl MockBotApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `getUpdates` result. Once the script is exhausted, polls return empty batches.
    pub fn push_batch(&self, ids: &[i64]) -> &Self {
        let batch = ids.iter().map(|&id| super::message_update(id)).collect();
        self.batches.lock().unwrap().push_back(Ok(batch));
        self
    }

    pub fn push_error(&self) -> &Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(DbotError::Transport("connection reset".to_string())));
        self
    }

    /// Updates returned to an `offset = -1` request.
    pub fn set_pending(&self, ids: &[i64]) {
        *self.pending.lock().unwrap() = ids.iter().map(|&id| super::message_update(id)).collect();
    }

    pub fn set_webhook_url(&self, url: &str) {
        *self.webhook_url.lock().unwrap() = url.to_string();
    }

    pub fn poll_offsets(&self) -> Vec<i64> {
        self.poll_calls.lock().unwrap().iter().map(|p| p.offset).collect()
    }

    pub fn deletes(&self) -> usize {
        self.delete_webhook_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BotApi for MockBotApi {
    async fn get_updates(&self, params: &GetUpdatesParams) -> Result<Vec<Update>> {
        self.poll_calls.lock().unwrap().push(params.clone());
        if params.offset == -1 {
            return Ok(self.pending.lock().unwrap().last().cloned().into_iter().collect());
        }
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete_webhook(&self, _drop_pending_updates: bool) -> Result<()> {
        self.delete_webhook_calls.fetch_add(1, Ordering::SeqCst);
        self.webhook_url.lock().unwrap().clear();
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        Ok(WebhookInfo {
            url: self.webhook_url.lock().unwrap().clone(),
            ..WebhookInfo::default()
        })
    }

    async fn set_webhook(&self, url: &str, _allowed_updates: &[String]) -> Result<()> {
        self.set_webhook_calls.lock().unwrap().push(url.to_string());
        self.set_webhook_url(url);
        Ok(())
    }

    async fn get_me(&self) -> Result<User> {
        self.get_me_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_me.load(Ordering::SeqCst) {
            return Err(DbotError::Api {
                code: 502,
                description: "Bad Gateway".to_string(),
            });
        }
        let mut me = user(42);
        me.is_bot = true;
        me.username = Some("test_bot".to_string());
        Ok(me)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(Message {
            message_id: 1000,
            from: None,
            sender_chat: None,
            chat: private_chat(chat_id),
            date: 0,
            text: Some(text.to_string()),
            caption: None,
        })
    }
}
