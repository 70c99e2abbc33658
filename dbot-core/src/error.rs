use crate::types::UpdateKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbotError {
    /// No (or more than one) known payload slot was populated.
    #[error(
        "Unsupported update kind in update {update_id} ({populated} populated payloads); \
         the Bot API may have introduced a new update type this dispatcher does not know yet"
    )]
    UnsupportedUpdateKind { update_id: i64, populated: usize },

    /// A handler registered on a registry takes a payload type other than the registry's.
    #[error("{kind} handler type mismatch: registry expects callback for {expected}, registered callback takes {actual}")]
    CallbackTypeMismatch {
        kind: UpdateKind,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Update {0} carries no conversation identity")]
    NoConversation(i64),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbotError {
    /// Classifier and binding errors stop the dispatch loop; everything else is contained.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DbotError::UnsupportedUpdateKind { .. } | DbotError::CallbackTypeMismatch { .. }
        )
    }
}

/// Rejections raised by middleware (or handlers) to gate processing.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(DbotError::UnsupportedUpdateKind { update_id: 1, populated: 0 }.is_fatal());
        assert!(DbotError::CallbackTypeMismatch {
            kind: UpdateKind::Poll,
            expected: "Poll",
            actual: "Message",
        }
        .is_fatal());
        assert!(!DbotError::Handler(HandlerError::Unauthorized).is_fatal());
        assert!(!DbotError::Transport("timeout".to_string()).is_fatal());
    }

    #[test]
    fn test_mismatch_message_names_both_shapes() {
        let err = DbotError::CallbackTypeMismatch {
            kind: UpdateKind::Message,
            expected: "dbot_core::types::Message",
            actual: "dbot_core::types::Poll",
        };
        let text = err.to_string();
        assert!(text.contains("message handler type mismatch"));
        assert!(text.contains("dbot_core::types::Message"));
        assert!(text.contains("dbot_core::types::Poll"));
    }
}
