//! # Adapters
//!
//! Pool-backed implementations of the lc-02 and lc-04 node ports, and an
//! in-process ledger for tests.

pub mod archive_node;
pub mod block_source;
pub mod mock_ledger;

pub use archive_node::PoolArchiveNode;
pub use block_source::PoolBlockSource;
pub use mock_ledger::{MockLedger, MockNetwork};
