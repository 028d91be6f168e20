//! Errors surfaced by the chat takeover core.

use thiserror::Error;

use crate::store::StorageError;

use super::model::SessionStatus;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Session lookup by ID or token came up empty.
    #[error("chat session not found: {0}")]
    SessionNotFound(String),

    /// Message content failed validation (empty or over the limit).
    #[error("message content must be between 1 and {max} characters")]
    InvalidContent { max: usize },

    /// Requested lifecycle transition is not legal from the current status.
    #[error("cannot {action} a session in status '{status}'")]
    InvalidTransition {
        status: SessionStatus,
        action: &'static str,
    },

    /// Admin tried to post into a session they have not taken over.
    #[error("session is not under admin takeover")]
    TakeoverRequired,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ChatResult<T> = Result<T, ChatError>;
