//! Node-facing messages: requests, responses, blocks and read/write sets.

/// Transaction type carried in every payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxType {
    /// State-changing contract invocation.
    InvokeContract = 0,
    /// Read-only contract query.
    QueryContract = 1,
    /// Block / tx / event subscription.
    Subscribe = 2,
    /// Archive management (archive, restore, status).
    Archive = 3,
}

/// Status codes returned by a node for a request or recorded in a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxStatusCode {
    Success = 0,
    Timeout = 1,
    InvalidParameter = 2,
    NoPermission = 3,
    ContractFail = 4,
    InternalError = 5,
    /// The requested block has been moved to the archive.
    ArchivedBlock = 6,
    /// The requested transaction lives in an archived block.
    ArchivedTx = 7,
}

/// How a member's identity is carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MemberType {
    Cert = 0,
    CertHash = 1,
    PublicKey = 2,
    Did = 3,
    Alias = 4,
}

/// Ordered key/bytes parameter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValuePair {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Resource cap attached to a payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Limit {
    #[prost(uint64, tag = "1")]
    pub gas_limit: u64,
}

/// The signed body of a transaction request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(enumeration = "TxType", tag = "2")]
    pub tx_type: i32,
    #[prost(string, tag = "3")]
    pub tx_id: String,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
    #[prost(int64, tag = "5")]
    pub expiration_time: i64,
    #[prost(string, tag = "6")]
    pub contract_name: String,
    #[prost(string, tag = "7")]
    pub method: String,
    #[prost(message, repeated, tag = "8")]
    pub parameters: Vec<KeyValuePair>,
    #[prost(uint64, tag = "9")]
    pub sequence: u64,
    #[prost(message, optional, tag = "10")]
    pub limit: Option<Limit>,
}

impl Payload {
    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&[u8]> {
        self.parameters
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_slice())
    }
}

/// Identity of a signer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Member {
    #[prost(string, tag = "1")]
    pub org_id: String,
    #[prost(enumeration = "MemberType", tag = "2")]
    pub member_type: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub member_info: Vec<u8>,
}

/// A signer plus its signature over the payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorsementEntry {
    #[prost(message, optional, tag = "1")]
    pub signer: Option<Member>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// Request sent to a node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRequest {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<Payload>,
    #[prost(message, optional, tag = "2")]
    pub sender: Option<EndorsementEntry>,
    #[prost(message, repeated, tag = "3")]
    pub endorsers: Vec<EndorsementEntry>,
    #[prost(message, optional, tag = "4")]
    pub payer: Option<EndorsementEntry>,
}

impl TxRequest {
    /// Transaction id of the payload, empty when absent.
    pub fn tx_id(&self) -> &str {
        self.payload.as_ref().map(|p| p.tx_id.as_str()).unwrap_or("")
    }

    /// Transaction type of the payload.
    pub fn kind(&self) -> TxType {
        self.payload
            .as_ref()
            .map(|p| p.tx_type())
            .unwrap_or(TxType::InvokeContract)
    }
}

/// Contract execution outcome.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContractResult {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub result: Vec<u8>,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(uint64, tag = "4")]
    pub gas_used: u64,
}

/// Node reply to a `TxRequest`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxResponse {
    #[prost(enumeration = "TxStatusCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub contract_result: Option<ContractResult>,
    #[prost(string, tag = "4")]
    pub tx_id: String,
    #[prost(int64, tag = "5")]
    pub tx_timestamp: i64,
    #[prost(uint64, tag = "6")]
    pub tx_block_height: u64,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code() == TxStatusCode::Success
    }

    /// Raw contract result bytes, empty when the node returned none.
    pub fn result_bytes(&self) -> &[u8] {
        self.contract_result
            .as_ref()
            .map(|r| r.result.as_slice())
            .unwrap_or(&[])
    }
}

/// Execution result recorded for a transaction inside a block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxResult {
    #[prost(enumeration = "TxStatusCode", tag = "1")]
    pub code: i32,
    #[prost(message, optional, tag = "2")]
    pub contract_result: Option<ContractResult>,
    #[prost(bytes = "vec", tag = "3")]
    pub rw_set_hash: Vec<u8>,
    #[prost(string, tag = "4")]
    pub message: String,
}

/// A transaction as stored in a block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<Payload>,
    #[prost(message, optional, tag = "2")]
    pub sender: Option<EndorsementEntry>,
    #[prost(message, repeated, tag = "3")]
    pub endorsers: Vec<EndorsementEntry>,
    #[prost(message, optional, tag = "4")]
    pub result: Option<TxResult>,
    #[prost(message, optional, tag = "5")]
    pub payer: Option<EndorsementEntry>,
}

impl Transaction {
    pub fn tx_id(&self) -> &str {
        self.payload.as_ref().map(|p| p.tx_id.as_str()).unwrap_or("")
    }

    pub fn timestamp(&self) -> i64 {
        self.payload.as_ref().map(|p| p.timestamp).unwrap_or(0)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockHeader {
    #[prost(uint32, tag = "1")]
    pub block_version: u32,
    #[prost(string, tag = "2")]
    pub chain_id: String,
    #[prost(uint64, tag = "3")]
    pub block_height: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub block_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub pre_block_hash: Vec<u8>,
    #[prost(uint32, tag = "6")]
    pub tx_count: u32,
    #[prost(bytes = "vec", tag = "7")]
    pub tx_root: Vec<u8>,
    #[prost(int64, tag = "8")]
    pub block_timestamp: i64,
    #[prost(message, optional, tag = "9")]
    pub proposer: Option<Member>,
    #[prost(bytes = "vec", tag = "10")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub header: Option<BlockHeader>,
    #[prost(message, repeated, tag = "2")]
    pub txs: Vec<Transaction>,
}

impl Block {
    pub fn height(&self) -> u64 {
        self.header.as_ref().map(|h| h.block_height).unwrap_or(0)
    }

    pub fn hash(&self) -> &[u8] {
        self.header
            .as_ref()
            .map(|h| h.block_hash.as_slice())
            .unwrap_or(&[])
    }

    pub fn chain_id(&self) -> &str {
        self.header
            .as_ref()
            .map(|h| h.chain_id.as_str())
            .unwrap_or("")
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRead {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(string, tag = "3")]
    pub contract_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxWrite {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(string, tag = "3")]
    pub contract_name: String,
}

/// Read/write set of one transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRwSet {
    #[prost(string, tag = "1")]
    pub tx_id: String,
    #[prost(message, repeated, tag = "2")]
    pub tx_reads: Vec<TxRead>,
    #[prost(message, repeated, tag = "3")]
    pub tx_writes: Vec<TxWrite>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContractEvent {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(string, tag = "2")]
    pub tx_id: String,
    #[prost(string, tag = "3")]
    pub contract_name: String,
    #[prost(string, repeated, tag = "4")]
    pub event_data: Vec<String>,
}

/// Block plus per-transaction read/write sets; the archived unit.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockWithRwSet {
    #[prost(message, optional, tag = "1")]
    pub block: Option<Block>,
    #[prost(message, repeated, tag = "2")]
    pub txrw_sets: Vec<TxRwSet>,
    #[prost(message, repeated, tag = "3")]
    pub contract_events: Vec<ContractEvent>,
}

impl BlockWithRwSet {
    pub fn height(&self) -> u64 {
        self.block.as_ref().map(Block::height).unwrap_or(0)
    }
}

/// Block as returned by chain queries and subscriptions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockInfo {
    #[prost(message, optional, tag = "1")]
    pub block: Option<Block>,
    #[prost(message, repeated, tag = "2")]
    pub rwset_list: Vec<TxRwSet>,
}

impl BlockInfo {
    pub fn height(&self) -> u64 {
        self.block.as_ref().map(Block::height).unwrap_or(0)
    }
}

impl From<BlockWithRwSet> for BlockInfo {
    fn from(value: BlockWithRwSet) -> Self {
        Self {
            block: value.block,
            rwset_list: value.txrw_sets,
        }
    }
}

impl From<BlockInfo> for BlockWithRwSet {
    fn from(value: BlockInfo) -> Self {
        Self {
            block: value.block,
            txrw_sets: value.rwset_list,
            contract_events: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionInfo {
    #[prost(message, optional, tag = "1")]
    pub transaction: Option<Transaction>,
    #[prost(uint64, tag = "2")]
    pub block_height: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub block_hash: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub tx_index: u32,
    #[prost(int64, tag = "5")]
    pub block_timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionInfoWithRwSet {
    #[prost(message, optional, tag = "1")]
    pub transaction: Option<Transaction>,
    #[prost(uint64, tag = "2")]
    pub block_height: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub block_hash: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub tx_index: u32,
    #[prost(int64, tag = "5")]
    pub block_timestamp: i64,
    #[prost(message, optional, tag = "6")]
    pub rw_set: Option<TxRwSet>,
}

/// Chain configuration snapshot.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChainConfig {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
    #[prost(string, tag = "4")]
    pub auth_type: String,
}

/// Frame of a server-streaming subscription; `data` is an encoded `BlockInfo`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeResult {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ArchiveProcess {
    Normal = 0,
    Archiving = 1,
    Restoring = 2,
}

/// Height interval already restored on the node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileRange {
    #[prost(uint64, tag = "1")]
    pub start: u64,
    #[prost(uint64, tag = "2")]
    pub end: u64,
}

/// Node-side archive status returned by the archive-status query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArchiveStatus {
    #[prost(uint64, tag = "1")]
    pub archive_pivot: u64,
    #[prost(uint64, tag = "2")]
    pub max_allow_archive_height: u64,
    #[prost(enumeration = "ArchiveProcess", tag = "3")]
    pub process: i32,
    #[prost(message, repeated, tag = "4")]
    pub file_ranges: Vec<FileRange>,
}
