//! # Application Layer

pub mod pool;

pub use pool::{ConnectionPool, Lease};
