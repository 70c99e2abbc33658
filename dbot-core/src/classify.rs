//! Update classifier: maps an [`Update`] to its single active kind and typed payload.

use crate::error::{DbotError, Result};
use crate::types::{
    CallbackQuery, ChatMemberUpdated, Message, Poll, PollAnswer, Update, UpdateKind,
};

/// Borrowed, typed view of the populated payload slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePayload<'a> {
    Message(&'a Message),
    CallbackQuery(&'a CallbackQuery),
    ChannelPost(&'a Message),
    Poll(&'a Poll),
    PollAnswer(&'a PollAnswer),
    ChatMember(&'a ChatMemberUpdated),
    MyChatMember(&'a ChatMemberUpdated),
}

impl UpdatePayload<'_> {
    pub fn kind(&self) -> UpdateKind {
        match self {
            UpdatePayload::Message(_) => UpdateKind::Message,
            UpdatePayload::CallbackQuery(_) => UpdateKind::CallbackQuery,
            UpdatePayload::ChannelPost(_) => UpdateKind::ChannelPost,
            UpdatePayload::Poll(_) => UpdateKind::Poll,
            UpdatePayload::PollAnswer(_) => UpdateKind::PollAnswer,
            UpdatePayload::ChatMember(_) => UpdateKind::ChatMember,
            UpdatePayload::MyChatMember(_) => UpdateKind::MyChatMember,
        }
    }
}

/// Returns the payload of the only populated slot.
///
/// Slots are examined in [`UpdateKind::ALL`] order. An update with no populated slot (a kind
/// unknown to this crate) or with several populated slots is rejected with
/// [`DbotError::UnsupportedUpdateKind`] rather than guessed.
pub fn classify(update: &Update) -> Result<UpdatePayload<'_>> {
    let slots = [
        update.message.as_ref().map(UpdatePayload::Message),
        update.callback_query.as_ref().map(UpdatePayload::CallbackQuery),
        update.channel_post.as_ref().map(UpdatePayload::ChannelPost),
        update.poll.as_ref().map(UpdatePayload::Poll),
        update.poll_answer.as_ref().map(UpdatePayload::PollAnswer),
        update.chat_member.as_ref().map(UpdatePayload::ChatMember),
        update.my_chat_member.as_ref().map(UpdatePayload::MyChatMember),
    ];

    let mut populated = slots.into_iter().flatten();
    match (populated.next(), populated.count()) {
        (Some(payload), 0) => Ok(payload),
        (first, rest) => Err(DbotError::UnsupportedUpdateKind {
            update_id: update.update_id,
            populated: usize::from(first.is_some()) + rest,
        }),
    }
}
