//! # SQL Archive
//!
//! Blocks are stored as prost-encoded `BlockWithRwSet` rows, each carrying
//! `SM3(chainId ∥ le64(height) ∥ payload ∥ secret)`. A cursor row tracks the
//! highest archived height; every height at or below it has a row.
//!
//! `ArchiveTable` is the storage seam: `MySqlArchiveTable` for production,
//! `MemoryArchiveTable` for tests and embedded use. `SqlArchiveBackend`
//! carries the write rules and integrity checks for both.

pub mod memory;
pub mod mysql;

pub use memory::MemoryArchiveTable;
pub use mysql::MySqlArchiveTable;

use crate::domain::{decide_write, ArchiveError, WriteAction};
use crate::ports::outbound::{block_info, tx_info, without_rwset};
use crate::ports::{ArchiveBackend, BlockIterator, ProgressFn};
use async_trait::async_trait;
use prost::Message;
use shared_crypto::{archive_hmac, verify_archive_hmac};
use shared_types::proto::{
    BlockInfo, BlockWithRwSet, ChainConfig, TransactionInfo, TransactionInfoWithRwSet,
};
use shared_types::{ArchiveProgress, StoreArchiveStatus};
use tracing::{debug, error, info};

/// One stored block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRow {
    pub height: u64,
    /// Hex block hash.
    pub block_hash: String,
    pub tx_ids: Vec<String>,
    pub payload: Vec<u8>,
    /// Hex-lowercase SM3 HMAC of the payload.
    pub hmac: String,
    pub archived: bool,
}

#[async_trait]
pub trait ArchiveTable: Send + Sync {
    /// Take the cross-process write lock. `false` when someone else holds it.
    async fn lock(&self) -> Result<bool, ArchiveError>;

    async fn unlock(&self) -> Result<(), ArchiveError>;

    /// Whether any process holds the write lock.
    async fn is_locked(&self) -> Result<bool, ArchiveError>;

    /// Archived-height cursor; `None` before the genesis block is stored.
    async fn cursor(&self) -> Result<Option<u64>, ArchiveError>;

    /// Archived flag of the row at `height`, if one exists.
    async fn row_state(&self, height: u64) -> Result<Option<bool>, ArchiveError>;

    /// Apply `action` for `row`. `Insert` advances the cursor in the same
    /// transaction.
    async fn apply(&self, row: &BlockRow, action: WriteAction) -> Result<(), ArchiveError>;

    async fn read(&self, height: u64) -> Result<Option<BlockRow>, ArchiveError>;

    async fn height_by_hash(&self, block_hash: &str) -> Result<Option<u64>, ArchiveError>;

    async fn height_by_tx_id(&self, tx_id: &str) -> Result<Option<u64>, ArchiveError>;

    async fn close(&self) -> Result<(), ArchiveError>;
}

pub struct SqlArchiveBackend<T> {
    table: T,
    chain_id: String,
    secret_key: String,
}

impl<T: ArchiveTable> SqlArchiveBackend<T> {
    pub fn new(table: T, chain_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            table,
            chain_id: chain_id.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Serialize and seal `block`. Contract events are not archived.
    pub fn seal(&self, block: &BlockWithRwSet) -> BlockRow {
        let stored = BlockWithRwSet {
            block: block.block.clone(),
            txrw_sets: block.txrw_sets.clone(),
            contract_events: Vec::new(),
        };
        let height = stored.height();
        let payload = stored.encode_to_vec();
        let hmac = archive_hmac(&self.chain_id, height, &payload, &self.secret_key);
        let inner = stored.block.as_ref();
        BlockRow {
            height,
            block_hash: hex::encode(inner.map(|b| b.hash()).unwrap_or(&[])),
            tx_ids: inner
                .map(|b| b.txs.iter().map(|tx| tx.tx_id().to_string()).collect())
                .unwrap_or_default(),
            payload,
            hmac,
            archived: true,
        }
    }

    /// Verify and decode a stored row.
    pub fn open(&self, row: &BlockRow) -> Result<BlockWithRwSet, ArchiveError> {
        if !verify_archive_hmac(
            &self.chain_id,
            row.height,
            &row.payload,
            &self.secret_key,
            &row.hmac,
        ) {
            error!("[lc-04] HMAC mismatch at height {}", row.height);
            return Err(ArchiveError::Integrity { height: row.height });
        }
        Ok(BlockWithRwSet::decode(row.payload.as_slice())?)
    }

    /// Write one block; the caller holds the lock.
    async fn write_locked(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        let height = block.height();
        let action = decide_write(self.table.row_state(height).await?);
        if action == WriteAction::Insert {
            match self.table.cursor().await? {
                None if height != 0 => {
                    return Err(ArchiveError::Remote {
                        height,
                        message: "chain genesis not registered".to_string(),
                    })
                }
                Some(cursor) if height > cursor.saturating_add(1) => {
                    return Err(ArchiveError::HeightGap {
                        node_begin: height,
                        store_height: cursor,
                    })
                }
                _ => {}
            }
        }
        debug!("[lc-04] {:?} height {}", action, height);
        if action != WriteAction::Skip {
            self.table.apply(&self.seal(block), action).await?;
        }
        Ok(())
    }

    async fn with_lock<F, R>(&self, work: F) -> Result<R, ArchiveError>
    where
        F: std::future::Future<Output = Result<R, ArchiveError>> + Send,
        R: Send,
    {
        if !self.table.lock().await? {
            return Err(ArchiveError::Busy("archive lock is held".to_string()));
        }
        let result = work.await;
        let released = self.table.unlock().await;
        let value = result?;
        released?;
        Ok(value)
    }

    async fn block_at(&self, height: u64) -> Result<BlockWithRwSet, ArchiveError> {
        let row = self
            .table
            .read(height)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("block {}", height)))?;
        self.open(&row)
    }

    async fn block_with_tx(&self, tx_id: &str) -> Result<BlockWithRwSet, ArchiveError> {
        let height = self
            .table
            .height_by_tx_id(tx_id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("transaction {}", tx_id)))?;
        self.block_at(height).await
    }
}

#[async_trait]
impl<T: ArchiveTable> ArchiveBackend for SqlArchiveBackend<T> {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn register(&self, genesis: &BlockWithRwSet) -> Result<(), ArchiveError> {
        if genesis.height() != 0 {
            return Err(ArchiveError::Remote {
                height: genesis.height(),
                message: "register expects the genesis block".to_string(),
            });
        }
        info!("[lc-04] Registering chain {} in SQL archive", self.chain_id);
        self.with_lock(self.write_locked(genesis)).await
    }

    async fn archive_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        self.with_lock(self.write_locked(block)).await
    }

    /// One lock for the whole run.
    async fn archive_blocks(
        &self,
        blocks: &mut dyn BlockIterator,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        self.with_lock(async move {
            let total = blocks.total();
            while let Some(next) = blocks.next().await {
                let height = blocks.current();
                let outcome = match next {
                    Ok(block) => self.write_locked(&block).await,
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
        })
        .await
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        Ok(block_info(self.block_at(height).await?, with_rwset))
    }

    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let height = self
            .table
            .height_by_hash(&block_hash.to_lowercase())
            .await?
            .ok_or_else(|| ArchiveError::NotFound(format!("block {}", block_hash)))?;
        Ok(block_info(self.block_at(height).await?, with_rwset))
    }

    async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        Ok(block_info(self.block_with_tx(tx_id).await?, with_rwset))
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ArchiveError> {
        self.get_tx_with_rwset_by_tx_id(tx_id).await.map(without_rwset)
    }

    async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ArchiveError> {
        let block = self.block_with_tx(tx_id).await?;
        tx_info(&block, tx_id)
            .ok_or_else(|| ArchiveError::NotFound(format!("transaction {}", tx_id)))
    }

    async fn get_chain_config_by_block_height(
        &self,
        _height: u64,
    ) -> Result<ChainConfig, ArchiveError> {
        Err(ArchiveError::NotSupported("get_chain_config_by_block_height"))
    }

    async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ArchiveError> {
        match self.table.cursor().await? {
            None => Ok(StoreArchiveStatus::genesis_not_exists()),
            Some(height) => Ok(StoreArchiveStatus::ok(
                height,
                self.table.is_locked().await?,
            )),
        }
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        self.table.close().await
    }
}
