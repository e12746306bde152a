//! # Ledger Client Test Suite
//!
//! Cross-crate scenarios run against in-process nodes and archive stores.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # keys, canned responses, session helpers
//! ├── integration/      # end-to-end scenarios
//! │   ├── failover.rs   # pool failover and channel repair through a session
//! │   ├── quorum.rs     # canonical reads
//! │   ├── archive.rs    # archive / restore windows and store idempotence
//! │   └── session.rs    # sync results, archived reads, archive round trip
//! └── properties.rs     # proptest invariants
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p lc-tests
//!
//! # By category
//! cargo test -p lc-tests integration::
//! cargo test -p lc-tests properties::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
pub mod properties;
