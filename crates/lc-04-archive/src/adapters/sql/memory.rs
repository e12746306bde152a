//! In-process archive table.

use super::{ArchiveTable, BlockRow};
use crate::domain::{ArchiveError, WriteAction};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    rows: BTreeMap<u64, BlockRow>,
    by_hash: HashMap<String, u64>,
    by_tx: HashMap<String, u64>,
    cursor: Option<u64>,
    locked: bool,
}

/// Shares state across clones, like a database would across connections.
#[derive(Clone, Default)]
pub struct MemoryArchiveTable {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryArchiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().rows.len()
    }

    /// Overwrite the archived flag of an existing row.
    pub fn set_archived(&self, height: u64, archived: bool) {
        if let Some(row) = self.inner.lock().rows.get_mut(&height) {
            row.archived = archived;
        }
    }

    /// Flip one payload bit without touching the HMAC.
    pub fn tamper(&self, height: u64) {
        if let Some(row) = self.inner.lock().rows.get_mut(&height) {
            match row.payload.last_mut() {
                Some(byte) => *byte ^= 0x01,
                None => row.payload.push(0x01),
            }
        }
    }
}

#[async_trait]
impl ArchiveTable for MemoryArchiveTable {
    async fn lock(&self) -> Result<bool, ArchiveError> {
        let mut tables = self.inner.lock();
        if tables.locked {
            return Ok(false);
        }
        tables.locked = true;
        Ok(true)
    }

    async fn unlock(&self) -> Result<(), ArchiveError> {
        self.inner.lock().locked = false;
        Ok(())
    }

    async fn is_locked(&self) -> Result<bool, ArchiveError> {
        Ok(self.inner.lock().locked)
    }

    async fn cursor(&self) -> Result<Option<u64>, ArchiveError> {
        Ok(self.inner.lock().cursor)
    }

    async fn row_state(&self, height: u64) -> Result<Option<bool>, ArchiveError> {
        Ok(self.inner.lock().rows.get(&height).map(|r| r.archived))
    }

    async fn apply(&self, row: &BlockRow, action: WriteAction) -> Result<(), ArchiveError> {
        let mut tables = self.inner.lock();
        match action {
            WriteAction::Skip => {}
            WriteAction::MarkArchived => {
                if let Some(existing) = tables.rows.get_mut(&row.height) {
                    existing.archived = true;
                }
            }
            WriteAction::Insert => {
                tables.by_hash.insert(row.block_hash.clone(), row.height);
                for tx_id in &row.tx_ids {
                    tables.by_tx.insert(tx_id.clone(), row.height);
                }
                tables.rows.insert(row.height, row.clone());
                let cursor = tables.cursor.map_or(row.height, |c| c.max(row.height));
                tables.cursor = Some(cursor);
            }
        }
        Ok(())
    }

    async fn read(&self, height: u64) -> Result<Option<BlockRow>, ArchiveError> {
        Ok(self.inner.lock().rows.get(&height).cloned())
    }

    async fn height_by_hash(&self, block_hash: &str) -> Result<Option<u64>, ArchiveError> {
        Ok(self.inner.lock().by_hash.get(block_hash).copied())
    }

    async fn height_by_tx_id(&self, tx_id: &str) -> Result<Option<u64>, ArchiveError> {
        Ok(self.inner.lock().by_tx.get(tx_id).copied())
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}
