//! Error types for the term store.

use thiserror::Error;

/// Term store result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Term store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// The shared store could not be opened. Fatal: nothing can proceed without it.
    #[error("State store unavailable: {0}")]
    Unavailable(String),

    /// A write named a term outside the fixed set.
    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    /// The stored term set differs from the local term sheet.
    #[error("Term set mismatch: store has [{stored}], expected [{expected}]")]
    TermSetMismatch { stored: String, expected: String },

    /// A value the store refuses to hold (NaN, infinity)
    #[error("Invalid value for {term}: {value}")]
    InvalidValue { term: String, value: f64 },

    /// A stored row could not be interpreted
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// SQLx error (query, pool, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    pub fn unknown_term(name: impl Into<String>) -> Self {
        Self::UnknownTerm(name.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Term-set errors indicate the two parties disagree on configuration.
    pub fn is_term_set_error(&self) -> bool {
        matches!(self, Self::UnknownTerm(_) | Self::TermSetMismatch { .. })
    }
}
