//! Shared fixtures for dbot-telegram integration tests.

#![allow(dead_code)]

pub mod mock_api;

use dbot_core::{Chat, Message, Update, User};

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: format!("user{}", id),
        last_name: None,
        username: None,
    }
}

pub fn private_chat(id: i64) -> Chat {
    Chat {
        id,
        chat_type: "private".to_string(),
        title: None,
        username: None,
    }
}

pub fn text_message(chat_id: i64, user_id: i64, text: &str) -> Message {
    Message {
        message_id: 1,
        from: Some(user(user_id)),
        sender_chat: None,
        chat: private_chat(chat_id),
        date: 1_700_000_000,
        text: Some(text.to_string()),
        caption: None,
    }
}

/// Update carrying a text message from user 20 in chat 10.
pub fn message_update(update_id: i64) -> Update {
    let mut update = Update::new(update_id);
    update.message = Some(text_message(10, 20, &format!("update {}", update_id)));
    update
}

pub fn channel_post_update(update_id: i64) -> Update {
    let mut update = Update::new(update_id);
    let mut post = text_message(-100, -100, "post");
    post.from = None;
    update.channel_post = Some(post);
    update
}
