//! # Outbound Ports
//!
//! - `ArchiveNode`: the consensus node whose history is moved out and back
//! - `ArchiveBackend`: where archived blocks live
//! - `BlockIterator`: forward-only block source feeding `archive_blocks`

use crate::domain::ArchiveError;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::proto::{
    Block, BlockHeader, BlockInfo, BlockWithRwSet, ChainConfig, Payload, Transaction,
    TransactionInfo, TransactionInfoWithRwSet, TxRwSet, TxType, TxWrite,
};
use shared_types::{ArchiveProgress, NodeArchiveStatus, StoreArchiveStatus};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Progress sink, called once per attempted block.
pub type ProgressFn<'a> = dyn FnMut(ArchiveProgress) + Send + 'a;

/// Forward-only, non-restartable sequence of blocks.
#[async_trait]
pub trait BlockIterator: Send {
    /// Next block, or `None` once the range is exhausted.
    async fn next(&mut self) -> Option<Result<BlockWithRwSet, ArchiveError>>;

    /// Height of the block last returned by `next`.
    fn current(&self) -> u64;

    /// Number of blocks the iterator covers.
    fn total(&self) -> u64;

    /// Drop held resources. Further `next` calls return `None`.
    fn release(&mut self);
}

/// Node-side archive operations.
#[async_trait]
pub trait ArchiveNode: Send + Sync {
    async fn archive_status(&self) -> Result<NodeArchiveStatus, ArchiveError>;

    async fn block_with_rwset(&self, height: u64) -> Result<BlockWithRwSet, ArchiveError>;

    /// Feed one archived block back into live storage.
    async fn restore_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError>;
}

/// Storage for archived blocks.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Introduce the chain to the store with its genesis block.
    async fn register(&self, genesis: &BlockWithRwSet) -> Result<(), ArchiveError>;

    async fn archive_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError>;

    /// Archive every block `blocks` yields, in order, stopping at the first
    /// failure. `progress` sees each attempted block exactly once.
    async fn archive_blocks(
        &self,
        blocks: &mut dyn BlockIterator,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        let total = blocks.total();
        while let Some(next) = blocks.next().await {
            let height = blocks.current();
            let outcome = match next {
                Ok(block) => self.archive_block(&block).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => progress(ArchiveProgress::ok(height, total)),
                Err(e) => {
                    progress(ArchiveProgress::failed(height, total, e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError>;

    /// `block_hash` is hex encoded.
    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError>;

    async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError>;

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ArchiveError>;

    async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ArchiveError>;

    async fn get_chain_config_by_block_height(
        &self,
        height: u64,
    ) -> Result<ChainConfig, ArchiveError>;

    async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ArchiveError>;

    async fn close(&self) -> Result<(), ArchiveError>;
}

/// Locate `tx_id` inside `block` and describe it.
pub(crate) fn tx_info(block: &BlockWithRwSet, tx_id: &str) -> Option<TransactionInfoWithRwSet> {
    let inner = block.block.as_ref()?;
    let index = inner.txs.iter().position(|tx| tx.tx_id() == tx_id)?;
    Some(TransactionInfoWithRwSet {
        transaction: inner.txs.get(index).cloned(),
        block_height: inner.height(),
        block_hash: inner.hash().to_vec(),
        tx_index: index as u32,
        block_timestamp: inner
            .header
            .as_ref()
            .map(|h| h.block_timestamp)
            .unwrap_or(0),
        rw_set: block.txrw_sets.iter().find(|rw| rw.tx_id == tx_id).cloned(),
    })
}

pub(crate) fn without_rwset(info: TransactionInfoWithRwSet) -> TransactionInfo {
    TransactionInfo {
        transaction: info.transaction,
        block_height: info.block_height,
        block_hash: info.block_hash,
        tx_index: info.tx_index,
        block_timestamp: info.block_timestamp,
    }
}

pub(crate) fn block_info(block: BlockWithRwSet, with_rwset: bool) -> BlockInfo {
    let mut info = BlockInfo::from(block);
    if !with_rwset {
        info.rwset_list.clear();
    }
    info
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Deterministic block at `height`: one transaction with one write.
pub fn sample_block(chain_id: &str, height: u64) -> BlockWithRwSet {
    let tx_id = format!("{:064x}", height + 1);
    let mut seed = chain_id.as_bytes().to_vec();
    seed.extend_from_slice(&height.to_be_bytes());
    let hash = shared_crypto::sha256(&seed).to_vec();
    BlockWithRwSet {
        block: Some(Block {
            header: Some(BlockHeader {
                chain_id: chain_id.to_string(),
                block_height: height,
                block_hash: hash,
                tx_count: 1,
                block_timestamp: 1_600_000_000 + height as i64,
                ..Default::default()
            }),
            txs: vec![Transaction {
                payload: Some(Payload {
                    chain_id: chain_id.to_string(),
                    tx_type: TxType::InvokeContract as i32,
                    tx_id: tx_id.clone(),
                    contract_name: "asset".to_string(),
                    method: "transfer".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        }),
        txrw_sets: vec![TxRwSet {
            tx_id,
            tx_reads: Vec::new(),
            tx_writes: vec![TxWrite {
                key: format!("k{}", height).into_bytes(),
                value: format!("v{}", height).into_bytes(),
                contract_name: "asset".to_string(),
            }],
        }],
        contract_events: Vec::new(),
    }
}

#[derive(Default)]
struct MockNodeState {
    status: Option<NodeArchiveStatus>,
    fetched: Vec<u64>,
    restored: Vec<u64>,
    fail_fetch_at: Option<u64>,
    fail_restore_at: Option<u64>,
}

/// In-memory node serving `sample_block`s.
#[derive(Clone)]
pub struct MockArchiveNode {
    chain_id: String,
    state: Arc<Mutex<MockNodeState>>,
}

impl MockArchiveNode {
    pub fn new(chain_id: impl Into<String>, status: NodeArchiveStatus) -> Self {
        Self {
            chain_id: chain_id.into(),
            state: Arc::new(Mutex::new(MockNodeState {
                status: Some(status),
                ..Default::default()
            })),
        }
    }

    pub fn set_status(&self, status: NodeArchiveStatus) {
        self.state.lock().status = Some(status);
    }

    pub fn fail_fetch_at(&self, height: u64) {
        self.state.lock().fail_fetch_at = Some(height);
    }

    pub fn fail_restore_at(&self, height: u64) {
        self.state.lock().fail_restore_at = Some(height);
    }

    /// Heights fetched so far, in call order.
    pub fn fetched(&self) -> Vec<u64> {
        self.state.lock().fetched.clone()
    }

    /// Heights restored so far, in call order.
    pub fn restored(&self) -> Vec<u64> {
        self.state.lock().restored.clone()
    }
}

#[async_trait]
impl ArchiveNode for MockArchiveNode {
    async fn archive_status(&self) -> Result<NodeArchiveStatus, ArchiveError> {
        self.state
            .lock()
            .status
            .clone()
            .ok_or_else(|| ArchiveError::Transport("node unreachable".to_string()))
    }

    async fn block_with_rwset(&self, height: u64) -> Result<BlockWithRwSet, ArchiveError> {
        let mut state = self.state.lock();
        state.fetched.push(height);
        if state.fail_fetch_at == Some(height) {
            return Err(ArchiveError::Transport(format!("fetch of {} failed", height)));
        }
        Ok(sample_block(&self.chain_id, height))
    }

    async fn restore_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        let height = block.height();
        let mut state = self.state.lock();
        if state.fail_restore_at == Some(height) {
            return Err(ArchiveError::Remote {
                height,
                message: "restore rejected".to_string(),
            });
        }
        state.restored.push(height);
        Ok(())
    }
}

/// Iterator over prepared blocks.
pub struct VecBlockIterator {
    blocks: VecDeque<BlockWithRwSet>,
    total: u64,
    current: u64,
}

impl VecBlockIterator {
    pub fn new(blocks: Vec<BlockWithRwSet>) -> Self {
        Self {
            total: blocks.len() as u64,
            blocks: blocks.into(),
            current: 0,
        }
    }
}

#[async_trait]
impl BlockIterator for VecBlockIterator {
    async fn next(&mut self) -> Option<Result<BlockWithRwSet, ArchiveError>> {
        let block = self.blocks.pop_front()?;
        self.current = block.height();
        Some(Ok(block))
    }

    fn current(&self) -> u64 {
        self.current
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn release(&mut self) {
        debug!("[lc-04] Releasing {} unread blocks", self.blocks.len());
        self.blocks.clear();
    }
}
