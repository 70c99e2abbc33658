//! In-memory conversation store.
//!
//! One `HashMap` keyed by [`ConversationIdentity`] behind a single `RwLock`. Records are created
//! lazily on first write. Suitable for tests and single-process bots; nothing survives a restart.

use async_trait::async_trait;
use dbot_core::{ConversationIdentity, StateData, StateRecord, Storage, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<RwLock<HashMap<ConversationIdentity, StateRecord>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with a record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the record for one conversation, if any.
    pub async fn record(&self, chat_id: i64, user_id: i64) -> Option<StateRecord> {
        let key = ConversationIdentity::new(chat_id, user_id);
        self.records.read().await.get(&key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn set_state(&self, chat_id: i64, user_id: i64, state: &str) -> Result<(), StorageError> {
        let key = ConversationIdentity::new(chat_id, user_id);
        debug!(chat_id, user_id, state = %state, "Setting conversation state");
        let mut records = self.records.write().await;
        records.entry(key).or_default().state = state.to_string();
        Ok(())
    }

    async fn get_state(&self, chat_id: i64, user_id: i64) -> Result<String, StorageError> {
        let key = ConversationIdentity::new(chat_id, user_id);
        let records = self.records.read().await;
        Ok(records.get(&key).map(|r| r.state.clone()).unwrap_or_default())
    }

    async fn set_data(&self, chat_id: i64, user_id: i64, data: StateData) -> Result<(), StorageError> {
        let key = ConversationIdentity::new(chat_id, user_id);
        debug!(chat_id, user_id, keys = data.len(), "Setting conversation data");
        let mut records = self.records.write().await;
        records.entry(key).or_default().data = data;
        Ok(())
    }

    async fn get_data(&self, chat_id: i64, user_id: i64) -> Result<StateData, StorageError> {
        let key = ConversationIdentity::new(chat_id, user_id);
        let records = self.records.read().await;
        Ok(records.get(&key).map(|r| r.data.clone()).unwrap_or_default())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        debug!(count = records.len(), "Clearing conversation store");
        records.clear();
        Ok(())
    }
}
