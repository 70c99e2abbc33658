//! Conversation state store contract.
//!
//! Implementations must do their own locking: handlers running as detached tasks call into the
//! store concurrently. No atomicity is promised across a `set_state`/`set_data` pair.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque per-conversation data blob.
pub type StateData = HashMap<String, serde_json::Value>;

/// State label and data held for one conversation. An empty `state` means no active state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: String,
    pub data: StateData,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn set_state(&self, chat_id: i64, user_id: i64, state: &str) -> Result<(), StorageError>;

    /// Returns an empty string when no state was set.
    async fn get_state(&self, chat_id: i64, user_id: i64) -> Result<String, StorageError>;

    async fn set_data(&self, chat_id: i64, user_id: i64, data: StateData) -> Result<(), StorageError>;

    /// Returns an empty map when no data was set.
    async fn get_data(&self, chat_id: i64, user_id: i64) -> Result<StateData, StorageError>;

    /// Drops every record.
    async fn clear(&self) -> Result<(), StorageError>;
}
