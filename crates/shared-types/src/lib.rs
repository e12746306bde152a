//! # Shared Types Crate
//!
//! Types shared by every subsystem of the ledger client.
//!
//! ## Contents
//!
//! - `proto` - Protobuf wire messages for the node and archive-service RPCs.
//!   These are encoded with prost, which is also the canonical encoder used
//!   for quorum fingerprints and archived payloads.
//! - `entities` - Transport-neutral domain entities (node descriptors,
//!   archive status, progress tokens, transaction result events).
//! - `errors` - The `ErrorKind` taxonomy every subsystem error maps onto.
//! - `rpc` - Transport-neutral RPC status used by the failover logic.
//!
//! ## Design Principles
//!
//! - **No maps in wire messages**: repeated fields keep insertion order, so
//!   the encoding of a message is a pure function of its value.
//! - **One taxonomy**: subsystem errors stay local, but all of them classify
//!   into `ErrorKind` so callers match on a single enum.

#![warn(clippy::all)]

pub mod entities;
pub mod errors;
pub mod proto;
pub mod rpc;

pub use entities::*;
pub use errors::ErrorKind;
pub use rpc::{RpcCode, RpcStatus};

/// Length of a transaction id in hex characters.
pub const TX_ID_HEX_LEN: usize = 64;
