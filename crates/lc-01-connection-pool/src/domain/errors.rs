//! # Domain Errors

use super::SlotId;
use shared_types::{ErrorKind, RpcStatus};
use thiserror::Error;

/// Connection pool errors. Every variant raised during a call names the slot.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// The pool was built with an empty node list.
    #[error("No nodes configured")]
    NoNodes,

    /// A node descriptor cannot be turned into an endpoint.
    #[error("Invalid node {address}: {reason}")]
    InvalidNode {
        /// Offending address
        address: String,
        /// What was wrong
        reason: String,
    },

    /// TLS material could not be loaded.
    #[error("TLS setup failed for {address}: {reason}")]
    Tls {
        /// Node address
        address: String,
        /// What was wrong
        reason: String,
    },

    /// Acquisition gave up.
    #[error("No serviceable connection after {attempts} attempts")]
    NoServiceableConnection {
        /// Attempts made
        attempts: usize,
    },

    /// The per-call deadline elapsed.
    #[error("Request timed out on slot {slot}")]
    Timeout {
        /// Slot the call was running on
        slot: SlotId,
    },

    /// Re-dialing did not fix a corrupted stream.
    #[error("Slot {slot} still corrupted after {repairs} repairs")]
    RepairExhausted {
        /// Slot being repaired
        slot: SlotId,
        /// Repairs attempted
        repairs: usize,
    },

    /// Any other RPC failure.
    #[error("RPC failed on slot {slot}: {status}")]
    Rpc {
        /// Slot the call was running on
        slot: SlotId,
        /// Transport status
        status: RpcStatus,
    },

    /// The pool has been closed.
    #[error("Connection pool closed")]
    Closed,
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::NoNodes | PoolError::InvalidNode { .. } | PoolError::Tls { .. } => {
                ErrorKind::ConfigInvalid
            }
            PoolError::NoServiceableConnection { .. } | PoolError::RepairExhausted { .. } => {
                ErrorKind::NoServiceableConnection
            }
            PoolError::Timeout { .. } => ErrorKind::Timeout,
            PoolError::Rpc { .. } => ErrorKind::Internal,
            PoolError::Closed => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_names_slot() {
        let err = PoolError::Rpc {
            slot: SlotId::new(1, 0),
            status: RpcStatus::internal("boom"),
        };
        assert!(err.to_string().contains("node1#0"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            PoolError::NoServiceableConnection { attempts: 5 }.kind(),
            ErrorKind::NoServiceableConnection
        );
        assert_eq!(
            PoolError::Timeout {
                slot: SlotId::new(0, 0)
            }
            .kind(),
            ErrorKind::Timeout
        );
    }
}
