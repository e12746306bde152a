//! # RPC Status
//!
//! Transport-neutral status for a failed remote call. Transport adapters map
//! their native status into this type so the failover logic stays
//! independent of the RPC library.

use thiserror::Error;

/// Status codes the failover logic distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    PermissionDenied,
    ResourceExhausted,
    Unimplemented,
    Internal,
    Unavailable,
    Other,
}

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rpc {code:?}: {message}")]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(RpcCode::DeadlineExceeded, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unknown, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Internal, message)
    }
}
