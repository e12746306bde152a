//! # Ports

pub mod outbound;

pub use outbound::{BlockSource, BlockStream, MockBlockSource};
