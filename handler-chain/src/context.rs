//! Per-update handler context.
//!
//! Built once per dispatched update and cloned into every middleware and handler call, so
//! handlers running as detached tasks never read shared "current update" state.

use dbot_core::{ConversationIdentity, DbotError, Result, State, StateData, Storage, Update};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    update: Arc<Update>,
    identity: Option<ConversationIdentity>,
    storage: Arc<dyn Storage>,
}

impl Context {
    /// Derives the conversation identity from `update`.
    pub fn new(update: Arc<Update>, storage: Arc<dyn Storage>) -> Self {
        let identity = ConversationIdentity::from_update(&update);
        Self {
            update,
            identity,
            storage,
        }
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn update_id(&self) -> i64 {
        self.update.update_id
    }

    /// `None` for updates that carry no chat or user (polls).
    pub fn identity(&self) -> Option<ConversationIdentity> {
        self.identity
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn require_identity(&self) -> Result<ConversationIdentity> {
        self.identity
            .ok_or(DbotError::NoConversation(self.update.update_id))
    }

    /// Current state label; empty when none is set.
    pub async fn state(&self) -> Result<String> {
        let id = self.require_identity()?;
        Ok(self.storage.get_state(id.chat_id, id.user_id).await?)
    }

    pub async fn set_state(&self, state: &State) -> Result<()> {
        self.set_state_label(&state.full_state()).await
    }

    pub async fn set_state_label(&self, label: &str) -> Result<()> {
        let id = self.require_identity()?;
        Ok(self.storage.set_state(id.chat_id, id.user_id, label).await?)
    }

    /// True if the conversation is currently in `state`.
    pub async fn in_state(&self, state: &State) -> Result<bool> {
        Ok(state.matches(&self.state().await?))
    }

    /// Leaves the current state; data is kept.
    pub async fn reset_state(&self) -> Result<()> {
        self.set_state_label("").await
    }

    pub async fn data(&self) -> Result<StateData> {
        let id = self.require_identity()?;
        Ok(self.storage.get_data(id.chat_id, id.user_id).await?)
    }

    pub async fn set_data(&self, data: StateData) -> Result<()> {
        let id = self.require_identity()?;
        Ok(self.storage.set_data(id.chat_id, id.user_id, data).await?)
    }

    /// Read-modify-write of one data key; returns the resulting map. Not atomic.
    pub async fn update_data(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<StateData> {
        let mut data = self.data().await?;
        data.insert(key.into(), value);
        self.set_data(data.clone()).await?;
        Ok(data)
    }

    /// Ends the conversation flow: clears both state and data.
    pub async fn finish(&self) -> Result<()> {
        self.reset_state().await?;
        self.set_data(StateData::new()).await
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("update_id", &self.update.update_id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
