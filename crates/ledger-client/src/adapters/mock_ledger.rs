//! # In-process Ledger
//!
//! A node that answers the built-in contracts from an in-memory chain. It
//! plugs in under the connection pool as a `NodeConnector`, so sessions under
//! test run the real pool, dispatcher, quorum and archive code.
//!
//! - invokes commit one block per transaction (or queue until
//!   `commit_pending` when auto-commit is off)
//! - heights in `(0, pivot]` that are not restored answer `ArchivedBlock` /
//!   `ArchivedTx`
//! - block subscriptions replay from `START_BLOCK` and then follow commits

use crate::request::system::{self, archive, chain_config, chain_query, params, subscribe};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lc_01_connection_pool::{ConnState, NodeChannel, NodeConnector, PoolError, SubscriptionStream};
use lc_04_archive::sample_block;
use parking_lot::Mutex;
use prost::Message;
use shared_types::proto::{
    self, ArchiveProcess, ArchiveStatus, BlockInfo, BlockWithRwSet, ChainConfig, ContractResult,
    FileRange, Payload, SubscribeResult, Transaction, TransactionInfo, TransactionInfoWithRwSet,
    TxRequest, TxResponse, TxResult, TxRwSet, TxStatusCode, TxType,
};
use shared_types::{ArchiveState, NodeArchiveStatus, NodeDescriptor, RpcStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type Frame = Result<SubscribeResult, RpcStatus>;

struct LedgerState {
    chain_id: String,
    blocks: Vec<BlockWithRwSet>,
    archive: NodeArchiveStatus,
    restored: Vec<u64>,
    auto_commit: bool,
    pending: Vec<Transaction>,
    query_result: Vec<u8>,
    subscribers: Vec<mpsc::UnboundedSender<Frame>>,
    calls: HashMap<String, usize>,
}

/// Shared handle to one in-memory chain.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    /// Chain with blocks `0..=height`.
    pub fn new(chain_id: &str, height: u64) -> Self {
        let blocks = (0..=height).map(|h| sample_block(chain_id, h)).collect();
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                chain_id: chain_id.to_string(),
                blocks,
                archive: NodeArchiveStatus::normal(0, height),
                restored: Vec::new(),
                auto_commit: true,
                pending: Vec::new(),
                query_result: Vec::new(),
                subscribers: Vec::new(),
                calls: HashMap::new(),
            })),
        }
    }

    pub fn height(&self) -> u64 {
        self.state.lock().blocks.len() as u64 - 1
    }

    pub fn block(&self, height: u64) -> Option<BlockWithRwSet> {
        self.state.lock().blocks.get(height as usize).cloned()
    }

    pub fn set_archive_status(&self, status: NodeArchiveStatus) {
        self.state.lock().archive = status;
    }

    /// Heights fed back through `RESTORE_BLOCK`, in arrival order.
    pub fn restored(&self) -> Vec<u64> {
        self.state.lock().restored.clone()
    }

    pub fn set_auto_commit(&self, auto_commit: bool) {
        self.state.lock().auto_commit = auto_commit;
    }

    /// Commit queued invokes as one block. Returns its height.
    pub fn commit_pending(&self) -> u64 {
        let mut state = self.state.lock();
        let txs = std::mem::take(&mut state.pending);
        state.commit(txs)
    }

    /// Contract result returned to user-contract queries.
    pub fn set_query_result(&self, result: &[u8]) {
        self.state.lock().query_result = result.to_vec();
    }

    /// Requests received for `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Fail every open block subscription.
    pub fn break_subscriptions(&self) {
        let subscribers = std::mem::take(&mut self.state.lock().subscribers);
        for subscriber in subscribers {
            let _ = subscriber.send(Err(RpcStatus::unavailable("subscription reset")));
        }
    }

    fn handle(&self, request: &TxRequest) -> TxResponse {
        let payload = request.payload.clone().unwrap_or_default();
        let mut state = self.state.lock();
        *state.calls.entry(payload.method.clone()).or_default() += 1;

        match (payload.contract_name.as_str(), payload.method.as_str()) {
            (system::CHAIN_QUERY, chain_query::GET_LAST_BLOCK) => {
                let last = state.blocks.len() as u64 - 1;
                state.read_block(last, false)
            }
            (system::CHAIN_QUERY, chain_query::GET_BLOCK_BY_HEIGHT) => {
                match param_height(&payload, params::BLOCK_HEIGHT) {
                    Some(height) => state.read_block(height, with_rwset(&payload)),
                    None => invalid("bad BLOCK_HEIGHT"),
                }
            }
            (system::CHAIN_QUERY, chain_query::GET_BLOCK_BY_HASH) => {
                let hash = param_str(&payload, params::BLOCK_HASH);
                match state.height_where(|b| hex_eq(b, &hash)) {
                    Some(height) => state.read_block(height, with_rwset(&payload)),
                    None => invalid("block not found"),
                }
            }
            (system::CHAIN_QUERY, chain_query::GET_BLOCK_BY_TX_ID) => {
                let tx_id = param_str(&payload, params::TX_ID);
                match state.locate_tx(&tx_id) {
                    Some((height, _)) => state.read_block(height, with_rwset(&payload)),
                    None => invalid("tx not found"),
                }
            }
            (system::CHAIN_QUERY, chain_query::GET_TX_BY_TX_ID) => {
                let tx_id = param_str(&payload, params::TX_ID);
                state.read_tx(&tx_id, |info, _| proto::encode(&info))
            }
            (system::CHAIN_QUERY, chain_query::GET_TX_WITH_RWSET_BY_TX_ID) => {
                let tx_id = param_str(&payload, params::TX_ID);
                state.read_tx(&tx_id, |info, rw_set| {
                    proto::encode(&TransactionInfoWithRwSet {
                        transaction: info.transaction,
                        block_height: info.block_height,
                        block_hash: info.block_hash,
                        tx_index: info.tx_index,
                        block_timestamp: info.block_timestamp,
                        rw_set,
                    })
                })
            }
            (system::CHAIN_CONFIG, chain_config::GET_CHAIN_CONFIG_AT) => {
                let sequence = param_height(&payload, params::BLOCK_HEIGHT).unwrap_or(0);
                success(proto::encode(&ChainConfig {
                    chain_id: state.chain_id.clone(),
                    version: "2.3.0".to_string(),
                    sequence,
                    auth_type: "public".to_string(),
                }))
            }
            (system::ARCHIVE_MANAGE, archive::GET_ARCHIVE_STATUS) => {
                success(proto::encode(&archive_status(&state.archive)))
            }
            (system::ARCHIVE_MANAGE, archive::RESTORE_BLOCK) => {
                let block = payload
                    .parameter(params::FULL_BLOCK)
                    .and_then(|raw| BlockWithRwSet::decode(raw).ok());
                match block {
                    Some(block) => {
                        state.restored.push(block.height());
                        success(Vec::new())
                    }
                    None => invalid("bad FULL_BLOCK"),
                }
            }
            _ if payload.tx_type() == TxType::InvokeContract => {
                let tx_id = payload.tx_id.clone();
                let tx = Transaction {
                    result: Some(TxResult {
                        code: TxStatusCode::Success as i32,
                        contract_result: Some(ContractResult {
                            result: payload.method.as_bytes().to_vec(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    payload: Some(payload),
                    sender: request.sender.clone(),
                    endorsers: request.endorsers.clone(),
                    payer: request.payer.clone(),
                };
                if state.auto_commit {
                    state.commit(vec![tx]);
                } else {
                    state.pending.push(tx);
                }
                TxResponse {
                    tx_id,
                    message: "OK".to_string(),
                    ..Default::default()
                }
            }
            _ => TxResponse {
                contract_result: Some(ContractResult {
                    result: state.query_result.clone(),
                    ..Default::default()
                }),
                tx_id: payload.tx_id,
                ..Default::default()
            },
        }
    }

    fn open_subscription(&self, request: &TxRequest) -> SubscriptionStream {
        let payload = request.payload.clone().unwrap_or_default();
        if payload.method != subscribe::SUBSCRIBE_BLOCK {
            return stream::iter(vec![Err(RpcStatus::internal("unsupported subscription"))])
                .boxed();
        }
        let start = param_height(&payload, params::START_BLOCK).unwrap_or(0) as usize;

        let mut state = self.state.lock();
        *state.calls.entry(payload.method.clone()).or_default() += 1;
        let replay: Vec<Frame> = state
            .blocks
            .iter()
            .skip(start)
            .map(|b| Ok(frame(b)))
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(tx);
        stream::iter(replay)
            .chain(UnboundedReceiverStream::new(rx))
            .boxed()
    }
}

impl LedgerState {
    fn is_archived(&self, height: u64) -> bool {
        height > 0
            && height <= self.archive.pivot
            && !self.archive.is_restored(height)
            && !self.restored.contains(&height)
    }

    fn read_block(&self, height: u64, with_rwset: bool) -> TxResponse {
        if self.is_archived(height) {
            return rejected(TxStatusCode::ArchivedBlock, "block archived");
        }
        match self.blocks.get(height as usize) {
            Some(block) => {
                let mut info = BlockInfo::from(block.clone());
                if !with_rwset {
                    info.rwset_list.clear();
                }
                success(proto::encode(&info))
            }
            None => invalid("block not found"),
        }
    }

    fn height_where(&self, pred: impl Fn(&BlockWithRwSet) -> bool) -> Option<u64> {
        self.blocks.iter().position(pred).map(|h| h as u64)
    }

    fn locate_tx(&self, tx_id: &str) -> Option<(u64, usize)> {
        self.blocks.iter().enumerate().find_map(|(h, b)| {
            b.block
                .as_ref()?
                .txs
                .iter()
                .position(|tx| tx.tx_id() == tx_id)
                .map(|i| (h as u64, i))
        })
    }

    fn read_tx(
        &self,
        tx_id: &str,
        encode: impl FnOnce(TransactionInfo, Option<TxRwSet>) -> Vec<u8>,
    ) -> TxResponse {
        let Some((height, index)) = self.locate_tx(tx_id) else {
            return invalid("tx not found");
        };
        if self.is_archived(height) {
            return rejected(TxStatusCode::ArchivedTx, "tx archived");
        }
        let block = &self.blocks[height as usize];
        let Some(inner) = block.block.as_ref() else {
            return invalid("empty block");
        };
        let info = TransactionInfo {
            transaction: inner.txs.get(index).cloned(),
            block_height: height,
            block_hash: inner.hash().to_vec(),
            tx_index: index as u32,
            block_timestamp: inner.header.as_ref().map(|h| h.block_timestamp).unwrap_or(0),
        };
        let rw_set = block.txrw_sets.iter().find(|rw| rw.tx_id == tx_id).cloned();
        success(encode(info, rw_set))
    }

    fn commit(&mut self, txs: Vec<Transaction>) -> u64 {
        let height = self.blocks.len() as u64;
        let mut block = sample_block(&self.chain_id, height);
        block.txrw_sets = txs
            .iter()
            .map(|tx| TxRwSet {
                tx_id: tx.tx_id().to_string(),
                ..Default::default()
            })
            .collect();
        if let Some(inner) = block.block.as_mut() {
            if let Some(header) = inner.header.as_mut() {
                header.tx_count = txs.len() as u32;
            }
            inner.txs = txs;
        }
        let framed = frame(&block);
        self.blocks.push(block);
        self.subscribers
            .retain(|subscriber| subscriber.send(Ok(framed.clone())).is_ok());
        height
    }
}

fn frame(block: &BlockWithRwSet) -> SubscribeResult {
    SubscribeResult {
        data: proto::encode(&BlockInfo {
            block: block.block.clone(),
            rwset_list: Vec::new(),
        }),
    }
}

fn archive_status(status: &NodeArchiveStatus) -> ArchiveStatus {
    let process = match status.state {
        ArchiveState::Normal => ArchiveProcess::Normal,
        ArchiveState::Archiving => ArchiveProcess::Archiving,
        ArchiveState::Restoring => ArchiveProcess::Restoring,
    };
    ArchiveStatus {
        archive_pivot: status.pivot,
        max_allow_archive_height: status.max_allow_height,
        process: process as i32,
        file_ranges: status
            .restored_ranges
            .iter()
            .map(|r| FileRange {
                start: r.start,
                end: r.end,
            })
            .collect(),
    }
}

fn param_str(payload: &Payload, key: &str) -> String {
    payload
        .parameter(key)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default()
}

fn param_height(payload: &Payload, key: &str) -> Option<u64> {
    payload.parameter(key).and_then(system::parse_height)
}

fn with_rwset(payload: &Payload) -> bool {
    payload.parameter(params::WITH_RWSET) == Some(system::flag(true).as_bytes())
}

fn hex_eq(block: &BlockWithRwSet, hash_hex: &str) -> bool {
    block
        .block
        .as_ref()
        .map(|b| hex_lower(b.hash()) == hash_hex.to_ascii_lowercase())
        .unwrap_or(false)
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn success(result: Vec<u8>) -> TxResponse {
    TxResponse {
        contract_result: Some(ContractResult {
            result,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn rejected(code: TxStatusCode, message: &str) -> TxResponse {
    TxResponse {
        code: code as i32,
        message: message.to_string(),
        ..Default::default()
    }
}

fn invalid(message: &str) -> TxResponse {
    rejected(TxStatusCode::InvalidParameter, message)
}

struct MockLedgerChannel {
    ledger: MockLedger,
    state: Mutex<ConnState>,
}

#[async_trait]
impl NodeChannel for MockLedgerChannel {
    async fn send_request(
        &self,
        request: TxRequest,
        _timeout: Duration,
    ) -> Result<TxResponse, RpcStatus> {
        if *self.state.lock() == ConnState::Shutdown {
            return Err(RpcStatus::unavailable("channel closed"));
        }
        *self.state.lock() = ConnState::Ready;
        Ok(self.ledger.handle(&request))
    }

    async fn subscribe(&self, request: TxRequest) -> Result<SubscriptionStream, RpcStatus> {
        if *self.state.lock() == ConnState::Shutdown {
            return Err(RpcStatus::unavailable("channel closed"));
        }
        Ok(self.ledger.open_subscription(&request))
    }

    fn state(&self) -> ConnState {
        *self.state.lock()
    }

    fn close(&self) {
        *self.state.lock() = ConnState::Shutdown;
    }
}

fn channel(ledger: MockLedger) -> Arc<dyn NodeChannel> {
    Arc::new(MockLedgerChannel {
        ledger,
        state: Mutex::new(ConnState::Idle),
    })
}

/// Every node address dials the same ledger.
#[async_trait]
impl NodeConnector for MockLedger {
    async fn dial(&self, _node: &NodeDescriptor) -> Result<Arc<dyn NodeChannel>, PoolError> {
        Ok(channel(self.clone()))
    }
}

/// Ledgers keyed by node address, for multi-node sessions.
#[derive(Clone, Default)]
pub struct MockNetwork {
    nodes: Arc<Mutex<HashMap<String, MockLedger>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, address: impl Into<String>, ledger: MockLedger) -> Self {
        self.nodes.lock().insert(address.into(), ledger);
        self
    }
}

#[async_trait]
impl NodeConnector for MockNetwork {
    async fn dial(&self, node: &NodeDescriptor) -> Result<Arc<dyn NodeChannel>, PoolError> {
        let ledger = self.nodes.lock().get(&node.address).cloned();
        match ledger {
            Some(ledger) => Ok(channel(ledger)),
            None => Err(PoolError::InvalidNode {
                address: node.address.clone(),
                reason: "no ledger at this address".into(),
            }),
        }
    }
}
