//! Archive-service messages.
//!
//! Every request is scoped by `chain_unique`, the hex-encoded hash of the
//! chain's genesis block, so one archive service can serve several chains.

use super::common::{BlockWithRwSet, ChainConfig, TransactionInfo, TransactionInfoWithRwSet};

/// Result codes used by the archive service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ArchiveCode {
    Ok = 0,
    /// The chain has never been registered with the service.
    GenesisNotExists = 1,
    InvalidParameter = 2,
    /// Another client is archiving this chain.
    Busy = 3,
    NotFound = 4,
    Failed = 5,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArchiveBlockRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    #[prost(message, optional, tag = "2")]
    pub block: Option<BlockWithRwSet>,
}

/// Acknowledgement for one streamed block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArchiveBlockResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(uint64, tag = "3")]
    pub archived_height: u64,
}

/// Reply to a single-write exchange.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SingleArchiveBlockResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(uint64, tag = "3")]
    pub archived_begin: u64,
    #[prost(uint64, tag = "4")]
    pub archived_end: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArchiveStatusRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArchiveStatusResponse {
    #[prost(uint64, tag = "1")]
    pub archived_height: u64,
    #[prost(bool, tag = "2")]
    pub in_archive: bool,
    #[prost(enumeration = "ArchiveCode", tag = "3")]
    pub code: i32,
    #[prost(string, tag = "4")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterRequest {
    #[prost(message, optional, tag = "1")]
    pub genesis: Option<BlockWithRwSet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockByHeightRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(bool, tag = "3")]
    pub with_rwset: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockByHashRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    /// Hex-encoded block hash.
    #[prost(string, tag = "2")]
    pub block_hash: String,
    #[prost(bool, tag = "3")]
    pub with_rwset: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockByTxIdRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    #[prost(string, tag = "2")]
    pub tx_id: String,
    #[prost(bool, tag = "3")]
    pub with_rwset: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockWithRwSetResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub block_data: Option<BlockWithRwSet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxByTxIdRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    #[prost(string, tag = "2")]
    pub tx_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub info: Option<TransactionInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionWithRwSetResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub info: Option<TransactionInfoWithRwSet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChainConfigByHeightRequest {
    #[prost(string, tag = "1")]
    pub chain_unique: String,
    #[prost(uint64, tag = "2")]
    pub height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChainConfigResponse {
    #[prost(enumeration = "ArchiveCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub config: Option<ChainConfig>,
}
