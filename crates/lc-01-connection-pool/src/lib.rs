//! # LC-01 Connection Pool
//!
//! Multiplexed connections to a fleet of consensus nodes with failover.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Every request the client sends to a node goes through this pool:
//! - `connCnt` slots per node, shuffled once at construction
//! - slots are dialed lazily, under the pool mutex
//! - unavailable slots are blacklisted for the rest of the call
//! - a slot whose stream came back corrupted is closed and re-dialed
//!
//! ## Failover Table
//!
//! | Signal | Action |
//! |--------|--------|
//! | Deadline exceeded | `Timeout`, no retry |
//! | Unavailable | blacklist slot, re-acquire, retry |
//! | Unknown + missing content-type | close channel, re-dial same slot, retry |
//! | Anything else | surfaced with the slot id |
//!
//! ## Module Structure
//!
//! ```text
//! lc-01-connection-pool/
//! ├── domain/          # SlotId, ConnState, failover classification, errors
//! ├── ports/           # NodeConnector / NodeChannel + mocks
//! ├── adapters/        # tonic channel, TLS material loading
//! ├── application/     # ConnectionPool
//! └── config.rs        # PoolConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{ClientIdentity, GrpcConnector};
pub use application::{ConnectionPool, Lease};
pub use config::PoolConfig;
pub use domain::{classify, ConnState, FailoverAction, PoolError, SlotId};
pub use ports::{MockConnector, MockNodeScript, NodeChannel, NodeConnector, SubscriptionStream};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
