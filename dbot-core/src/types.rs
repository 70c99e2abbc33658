//! Wire model: the update envelope and the payload types it can carry.
//!
//! Field names follow the Telegram Bot API JSON so an [`Update`] can be decoded directly from a
//! `getUpdates` result or a webhook body. Unknown fields are ignored.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User or bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Private chat, group, supergroup or channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// A message; also the payload of channel posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    /// Set for messages sent on behalf of a chat (channel posts, anonymous admins).
    pub sender_chat: Option<Chat>,
    pub chat: Chat,
    /// Unix time in seconds.
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl Message {
    /// Text of the message, falling back to the media caption.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Send time as a UTC timestamp; `None` if `date` is out of range.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date, 0).single()
    }
}

/// Press of an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Message carrying the button; absent for buttons on inline-mode messages.
    pub message: Option<Message>,
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub chat_instance: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub voter_count: i64,
}

/// Poll state as pushed by the remote when it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub total_voter_count: i64,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// A user's (or anonymous chat's) answer in a non-anonymous poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    pub user: Option<User>,
    pub voter_chat: Option<Chat>,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

/// Membership change; payload of both `chat_member` and `my_chat_member` updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

/// One incoming event. Exactly one payload slot is expected to be populated; see
/// [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default)]
    pub channel_post: Option<Message>,
    #[serde(default)]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub poll_answer: Option<PollAnswer>,
    #[serde(default)]
    pub chat_member: Option<ChatMemberUpdated>,
    #[serde(default)]
    pub my_chat_member: Option<ChatMemberUpdated>,
}

impl Update {
    /// Empty envelope; fill exactly one slot before dispatching.
    pub fn new(update_id: i64) -> Self {
        Self {
            update_id,
            message: None,
            callback_query: None,
            channel_post: None,
            poll: None,
            poll_answer: None,
            chat_member: None,
            my_chat_member: None,
        }
    }

    /// Kinds whose slot is populated, in classification priority order.
    pub fn populated_kinds(&self) -> Vec<UpdateKind> {
        UpdateKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                UpdateKind::Message => self.message.is_some(),
                UpdateKind::CallbackQuery => self.callback_query.is_some(),
                UpdateKind::ChannelPost => self.channel_post.is_some(),
                UpdateKind::Poll => self.poll.is_some(),
                UpdateKind::PollAnswer => self.poll_answer.is_some(),
                UpdateKind::ChatMember => self.chat_member.is_some(),
                UpdateKind::MyChatMember => self.my_chat_member.is_some(),
            })
            .collect()
    }
}

/// Discriminant of an [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateKind {
    Message,
    CallbackQuery,
    ChannelPost,
    Poll,
    PollAnswer,
    ChatMember,
    MyChatMember,
}

impl UpdateKind {
    /// Every supported kind, in classification priority order.
    pub const ALL: [UpdateKind; 7] = [
        UpdateKind::Message,
        UpdateKind::CallbackQuery,
        UpdateKind::ChannelPost,
        UpdateKind::Poll,
        UpdateKind::PollAnswer,
        UpdateKind::ChatMember,
        UpdateKind::MyChatMember,
    ];

    /// Field name used by the remote API (also the `allowed_updates` value).
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::ChannelPost => "channel_post",
            UpdateKind::Poll => "poll",
            UpdateKind::PollAnswer => "poll_answer",
            UpdateKind::ChatMember => "chat_member",
            UpdateKind::MyChatMember => "my_chat_member",
        }
    }

    /// Position in [`UpdateKind::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// `allowed_updates` list covering every supported kind.
    pub fn allowed_updates() -> Vec<String> {
        Self::ALL.iter().map(|k| k.as_str().to_string()).collect()
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How handler callbacks (and lifecycle hooks) are run relative to the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Awaited inline: the next update is not dispatched until every handler has returned.
    #[default]
    Synchronous,
    /// Spawned as detached tasks: dispatch order is kept, completion order is not.
    Asynchronous,
}

impl ExecutionMode {
    pub fn is_synchronous(&self) -> bool {
        matches!(self, ExecutionMode::Synchronous)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ExecutionMode::Synchronous),
            "async" | "asynchronous" => Ok(ExecutionMode::Asynchronous),
            other => Err(format!("unknown dispatch mode '{}', expected sync or async", other)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Synchronous => f.write_str("sync"),
            ExecutionMode::Asynchronous => f.write_str("async"),
        }
    }
}
