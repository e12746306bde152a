//! # Integration Scenarios

pub mod archive;
pub mod failover;
pub mod quorum;
pub mod session;
