//! # Ports

pub mod outbound;

pub use outbound::{MockFetcher, QueryFetcher};
