//! # Domain Layer
//!
//! Slot identity, connectivity state, failover classification and errors.

pub mod entities;
pub mod errors;
pub mod failover;

pub use entities::{ConnState, SlotId};
pub use errors::PoolError;
pub use failover::{classify, FailoverAction, CORRUPT_STREAM_MARKER};
