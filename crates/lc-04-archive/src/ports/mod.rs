//! # Ports Layer

pub mod outbound;

pub use outbound::{
    sample_block, ArchiveBackend, ArchiveNode, BlockIterator, MockArchiveNode, ProgressFn,
    VecBlockIterator,
};
