//! # Wire Messages
//!
//! Protobuf messages exchanged with consensus nodes (`common`) and with the
//! archive service (`archive`). The messages are declared with prost derives
//! instead of generated code so the crate builds without `protoc`.
//!
//! Tags mirror the node's published schema. None of these messages contain
//! map fields, which keeps their encoding deterministic.

pub mod archive;
pub mod common;

pub use archive::*;
pub use common::*;

use prost::Message;

/// Encode any wire message to a fresh buffer.
pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decode a wire message, mapping the prost error to a string.
pub fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M, String> {
    M::decode(bytes).map_err(|e| e.to_string())
}
