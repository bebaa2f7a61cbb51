use thiserror::Error;

pub type Result<T> = std::result::Result<T, BusError>;

/// Transport-level failures. `NotificationBus` swallows these; they only
/// reach callers of the lower-level connect and relay functions and of
/// `Subscription::next_message`.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Notification bus unavailable: {0}")]
    Unavailable(String),

    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification channel closed")]
    Closed,
}

impl From<zeromq::ZmqError> for BusError {
    fn from(e: zeromq::ZmqError) -> Self {
        Self::Transport(e.to_string())
    }
}
