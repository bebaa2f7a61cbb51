use dealroom_db::DbError;
use thiserror::Error;

use crate::state::SessionState;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Fatal session errors. Bus failures never appear here; they degrade the
/// session instead.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Store unavailable, unknown term, or term-set mismatch
    #[error(transparent)]
    Store(#[from] DbError),

    #[error("Unknown game '{0}'")]
    UnknownGame(String),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// The action source failed (input closed, I/O error)
    #[error("Driver error: {0}")]
    Driver(String),
}

impl SessionError {
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }
}
