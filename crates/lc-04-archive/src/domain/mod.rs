//! # Domain Layer

pub mod errors;
pub mod plan;
pub mod write;

pub use errors::ArchiveError;
pub use plan::{node_window, reconcile, restore_heights, ArchiveWindow};
pub use write::{decide_write, shard_index, shard_table, WriteAction};
