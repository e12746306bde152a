//! # LC-02 Transaction Result Dispatcher
//!
//! One long-lived block subscription fanned out to per-transaction waiters.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Flow
//!
//! ```text
//! BlockSource ──blocks──► pump task ──TxResultEvent──► WaiterRegistry ──► Waiter
//!      ▲                     │
//!      └── resubscribe ◄─────┘ (1 s backoff, from last seen height)
//! ```
//!
//! ## Guarantees
//!
//! - a waiter receives at most one value, delivered without blocking
//! - a waiter is retired by its first delivery or by `unregister`
//! - events arrive in block order, then in-block order
//! - re-delivery of a block after resubscribe is harmless

#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use application::TxResultDispatcher;
pub use config::DispatcherConfig;
pub use domain::{DispatcherError, Waiter, WaiterRegistry};
pub use ports::{BlockSource, BlockStream, MockBlockSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
