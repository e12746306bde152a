//! # LC-03 Canonical Quorum Query
//!
//! Scatter-gather read that returns the first response a strict majority of
//! nodes agree on byte for byte.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Algorithm
//!
//! 1. `quorum = ⌊N/2⌋ + 1`
//! 2. one fetcher task per node, each through its own pool
//! 3. every response is fingerprinted as `SHA-256(prost encoding)`
//! 4. first fingerprint reaching `quorum` wins; outstanding fetchers are
//!    cancelled
//! 5. `N` responses without a winner is `NoQuorum`; the deadline is `Timeout`
//!
//! ## Module Structure
//!
//! ```text
//! lc-03-canonical-query/
//! ├── domain/          # quorum maths, fingerprint, collector, errors
//! ├── ports/           # QueryFetcher + mock
//! ├── adapters/        # one ConnectionPool per node
//! ├── application/     # CanonicalQueryService
//! └── config.rs        # QuorumConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::PoolFetcher;
pub use application::CanonicalQueryService;
pub use config::QuorumConfig;
pub use domain::{fingerprint, quorum_size, QuorumCollector, QuorumError, Verdict};
pub use ports::{MockFetcher, QueryFetcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
