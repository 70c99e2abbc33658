//! # dbot-core
//!
//! Core of the update dispatcher: the [`Update`] wire model, the [`classify`] function, conversation
//! identity and the [`Storage`] contract for per-conversation state, error types, and tracing
//! initialization. Transport-agnostic; used by handler-chain, storage and dbot-telegram.

pub mod classify;
pub mod error;
pub mod fsm;
pub mod identity;
pub mod logger;
pub mod storage;
pub mod types;

pub use classify::{classify, UpdatePayload};
pub use error::{DbotError, HandlerError, Result, StorageError};
pub use fsm::State;
pub use identity::ConversationIdentity;
pub use logger::init_tracing;
pub use storage::{StateData, StateRecord, Storage};
pub use types::{
    CallbackQuery, Chat, ChatMember, ChatMemberUpdated, ExecutionMode, Message, Poll, PollAnswer,
    PollOption, Update, UpdateKind, User,
};
