//! Client error types.
//!
//! Protocol-level failures never show up here; they travel as ERROR events.

use meshcore_companion_protocol::ErrorDetail;
use thiserror::Error;

/// Outcome of a failed [`wait_for`](crate::EventDispatcher::wait_for).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// No matching event arrived before the deadline.
    #[error("timed out waiting for event")]
    Timeout,

    /// The waiter was dropped from the registry before it resolved.
    #[error("event dispatcher closed")]
    Closed,
}

impl From<WaitError> for ErrorDetail {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout => ErrorDetail::Timeout,
            WaitError::Closed => ErrorDetail::Dispatch(err.to_string()),
        }
    }
}

/// Transport errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport not connected")]
    NotConnected,
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
