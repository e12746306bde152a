//! # Domain Errors

use shared_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DispatcherError {
    /// The block source failed (query or subscription).
    #[error("Block source error: {0}")]
    Source(String),

    /// No result arrived before the deadline.
    #[error("No result for tx {tx_id} within deadline")]
    Timeout {
        /// Transaction waited on
        tx_id: String,
    },

    /// The waiter was unregistered while someone was still waiting.
    #[error("Waiter for tx {tx_id} closed")]
    Closed {
        /// Transaction waited on
        tx_id: String,
    },

    #[error("Dispatcher already running")]
    AlreadyRunning,
}

impl DispatcherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatcherError::Source(_) => ErrorKind::Transport,
            DispatcherError::Timeout { .. } => ErrorKind::Timeout,
            DispatcherError::Closed { .. } => ErrorKind::Cancelled,
            DispatcherError::AlreadyRunning => ErrorKind::Internal,
        }
    }
}
