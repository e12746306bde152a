//! # LC-04 Archival Pipeline
//!
//! Moves old blocks from a node into an archive store and back.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Archive
//!
//! 1. node must be `Normal`; window is `[pivot+1, min(target, maxAllow)]`
//! 2. an unregistered store receives the genesis block first
//! 3. a busy store is refused; a node ahead of the store is a `HeightGap`
//! 4. the window starts right after the store cursor and streams ascending,
//!    progress reported once per attempted block
//!
//! ## Restore
//!
//! Heights from the pivot down to the target, skipping ranges the node
//! already restored, each read from the store and fed back to the node.
//!
//! ## Backends
//!
//! | Backend | Writes | Reads |
//! |---------|--------|-------|
//! | archive service, gRPC | stream or single write | yes |
//! | archive service, HTTP | `NotSupported` | yes |
//! | MySQL | sharded rows + cursor under a named lock | HMAC verified |
//! | memory | as MySQL | HMAC verified |
//!
//! ## Module Structure
//!
//! ```text
//! lc-04-archive/
//! ├── domain/          # window/restore arithmetic, SQL write rules, errors
//! ├── ports/           # ArchiveNode, ArchiveBackend, BlockIterator + mocks
//! ├── adapters/        # node iterator, grpc, http, sql, backend enum
//! ├── application/     # ArchivePipeline
//! └── config.rs        # ArchiveCenterConfig, SqlArchiveConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    AnyArchiveBackend, ArchiveTable, BlockRow, GrpcArchiveBackend, HttpArchiveBackend,
    MemoryArchiveTable, MySqlArchiveTable, NodeBlockIterator, SqlArchiveBackend,
};
pub use application::ArchivePipeline;
pub use config::{ArchiveCenterConfig, ArchiveTlsConfig, SqlArchiveConfig};
pub use domain::{
    decide_write, node_window, reconcile, restore_heights, ArchiveError, ArchiveWindow,
    WriteAction,
};
pub use ports::{
    sample_block, ArchiveBackend, ArchiveNode, BlockIterator, MockArchiveNode, ProgressFn,
    VecBlockIterator,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
