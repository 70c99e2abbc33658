//! Conversation identity: the (chat, user) key under which conversation state is stored.

use crate::types::{Message, Update};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationIdentity {
    pub chat_id: i64,
    pub user_id: i64,
}

impl ConversationIdentity {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }

    /// Derives the identity from the update's populated slot.
    ///
    /// Returns `None` for poll updates (they have neither chat nor user) and for updates with no
    /// populated slot. When several slots are populated the first in priority order wins; such
    /// updates never reach handlers since the classifier rejects them.
    pub fn from_update(update: &Update) -> Option<Self> {
        if let Some(message) = update.message.as_ref().or(update.channel_post.as_ref()) {
            return Some(Self::from_message(message));
        }
        if let Some(query) = &update.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id);
            return Some(Self::new(chat_id, query.from.id));
        }
        if update.poll.is_some() {
            return None;
        }
        if let Some(answer) = &update.poll_answer {
            let id = answer
                .user
                .as_ref()
                .map(|u| u.id)
                .or_else(|| answer.voter_chat.as_ref().map(|c| c.id))?;
            return Some(Self::new(id, id));
        }
        update
            .chat_member
            .as_ref()
            .or(update.my_chat_member.as_ref())
            .map(|member| Self::new(member.chat.id, member.from.id))
    }

    /// Anonymous messages (channel posts) are keyed by the chat itself.
    fn from_message(message: &Message) -> Self {
        let user_id = message
            .from
            .as_ref()
            .map(|u| u.id)
            .unwrap_or(message.chat.id);
        Self::new(message.chat.id, user_id)
    }
}

impl fmt::Display for ConversationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.user_id)
    }
}
