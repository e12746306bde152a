//! # Domain Layer

pub mod collector;
pub mod errors;

pub use collector::{fingerprint, quorum_size, Fingerprint, QuorumCollector, Verdict};
pub use errors::QuorumError;
