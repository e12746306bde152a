//! # Domain Errors

use shared_types::{ErrorKind, RpcStatus};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// Node is not idle, or the store is being written by someone else.
    #[error("Archive busy: {0}")]
    Busy(String),

    /// The node already dropped heights the store never received.
    #[error("Height gap: node resumes at {node_begin} but store is at {store_height}")]
    HeightGap { node_begin: u64, store_height: u64 },

    #[error("Nothing to archive in [{begin}, {end}]")]
    NothingToArchive { begin: u64, end: u64 },

    #[error("Nothing to restore: target {target} is above pivot {pivot}")]
    NothingToRestore { target: u64, pivot: u64 },

    /// Stored HMAC does not match the stored payload.
    #[error("Integrity check failed at height {height}")]
    Integrity { height: u64 },

    /// Archive service or node answered with a non-success code.
    #[error("Rejected at height {height}: {message}")]
    Remote { height: u64, message: String },

    #[error("{0} not found in archive")]
    NotFound(String),

    #[error("{0} is not supported by this backend")]
    NotSupported(&'static str),

    #[error("Archive transport error: {0}")]
    Transport(String),

    #[error("Archive call timed out: {0}")]
    Timeout(String),

    #[error("Archive storage error: {0}")]
    Storage(String),

    #[error("Malformed archive payload: {0}")]
    Decode(String),

    #[error("Invalid archive configuration: {0}")]
    Config(String),
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::Busy(_) => ErrorKind::Busy,
            ArchiveError::HeightGap { .. } => ErrorKind::HeightGap,
            ArchiveError::NothingToArchive { .. } => ErrorKind::NothingToArchive,
            ArchiveError::NothingToRestore { .. } => ErrorKind::NothingToRestore,
            ArchiveError::Integrity { .. } => ErrorKind::ArchiveIntegrity,
            ArchiveError::Remote { .. } | ArchiveError::NotFound(_) => ErrorKind::RemoteRejected,
            ArchiveError::NotSupported(_) => ErrorKind::NotSupported,
            ArchiveError::Transport(_) => ErrorKind::Transport,
            ArchiveError::Timeout(_) => ErrorKind::Timeout,
            ArchiveError::Storage(_) | ArchiveError::Decode(_) => ErrorKind::Internal,
            ArchiveError::Config(_) => ErrorKind::ConfigInvalid,
        }
    }
}

impl From<RpcStatus> for ArchiveError {
    fn from(status: RpcStatus) -> Self {
        ArchiveError::Transport(status.to_string())
    }
}

impl From<sqlx::Error> for ArchiveError {
    fn from(e: sqlx::Error) -> Self {
        ArchiveError::Storage(e.to_string())
    }
}

impl From<prost::DecodeError> for ArchiveError {
    fn from(e: prost::DecodeError) -> Self {
        ArchiveError::Decode(e.to_string())
    }
}
