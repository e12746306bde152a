//! # Client Errors
//!
//! One enum for everything a session call can fail with. Subsystem errors
//! are wrapped as-is, so `kind()` always reports the subsystem's own
//! classification.

use crate::container::config::ConfigError;
use lc_01_connection_pool::PoolError;
use lc_02_tx_dispatcher::DispatcherError;
use lc_03_canonical_query::QuorumError;
use lc_04_archive::ArchiveError;
use shared_crypto::CryptoError;
use shared_types::proto::TxStatusCode;
use shared_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    #[error(transparent)]
    Quorum(#[from] QuorumError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The node answered with a non-success code.
    #[error("Node rejected {what}: {code:?} {message}")]
    Rejected {
        what: String,
        code: TxStatusCode,
        message: String,
    },

    /// The data lives in the archive and no archive backend is configured.
    #[error("{0} has been archived and no archive backend is configured")]
    Archived(String),

    /// Polling for a transaction result ran out of attempts.
    #[error("No result for tx {tx_id} after {attempts} polls")]
    SyncResultTimeout { tx_id: String, attempts: usize },

    #[error("Malformed node response: {0}")]
    Decode(String),

    #[error("Session closed")]
    Closed,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Config(e) => e.kind(),
            ClientError::Pool(e) => e.kind(),
            ClientError::Dispatcher(e) => e.kind(),
            ClientError::Quorum(e) => e.kind(),
            ClientError::Archive(e) => e.kind(),
            ClientError::Crypto(e) => e.kind(),
            ClientError::Rejected { .. } | ClientError::Archived(_) => ErrorKind::RemoteRejected,
            ClientError::SyncResultTimeout { .. } => ErrorKind::Timeout,
            ClientError::Decode(_) => ErrorKind::Internal,
            ClientError::Closed => ErrorKind::Cancelled,
        }
    }

    /// The node moved the requested data to the archive.
    pub fn is_archived(&self) -> bool {
        matches!(
            self,
            ClientError::Rejected {
                code: TxStatusCode::ArchivedBlock | TxStatusCode::ArchivedTx,
                ..
            }
        )
    }
}

impl From<prost::DecodeError> for ClientError {
    fn from(e: prost::DecodeError) -> Self {
        ClientError::Decode(e.to_string())
    }
}
