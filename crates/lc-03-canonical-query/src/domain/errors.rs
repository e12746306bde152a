//! # Domain Errors

use shared_types::ErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum QuorumError {
    /// Canonical queries only apply to query-type transactions.
    #[error("Transaction type {0} is not a query")]
    NotAQuery(String),

    #[error("No nodes to query")]
    NoNodes,

    /// Every node answered but no answer reached a majority.
    #[error("No quorum: best answer had {best} of {responses} votes, need {quorum}")]
    NoQuorum {
        /// Responses collected
        responses: usize,
        /// Votes of the most common fingerprint
        best: usize,
        /// Votes required
        quorum: usize,
    },

    #[error("Canonical query timed out after {0:?}")]
    Timeout(Duration),
}

impl QuorumError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuorumError::NotAQuery(_) => ErrorKind::NotSupported,
            QuorumError::NoNodes => ErrorKind::ConfigInvalid,
            QuorumError::NoQuorum { .. } => ErrorKind::NoQuorum,
            QuorumError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}
