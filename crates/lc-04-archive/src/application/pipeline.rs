//! # Archive Pipeline
//!
//! Moves blocks between the node and a backend.
//!
//! `archive`: node window, store cursor, then one ascending run through
//! `ArchiveBackend::archive_blocks`. `restore`: descending, one block at a
//! time from the backend back into the node.

use crate::adapters::NodeBlockIterator;
use crate::domain::{node_window, reconcile, restore_heights, ArchiveError};
use crate::ports::outbound::BlockIterator;
use crate::ports::{ArchiveBackend, ArchiveNode, ProgressFn};
use shared_types::proto::BlockWithRwSet;
use shared_types::{ArchiveProgress, StoreStatusCode};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct ArchivePipeline {
    node: Arc<dyn ArchiveNode>,
    backend: Arc<dyn ArchiveBackend>,
}

impl ArchivePipeline {
    pub fn new(node: Arc<dyn ArchiveNode>, backend: Arc<dyn ArchiveBackend>) -> Self {
        Self { node, backend }
    }

    pub fn backend(&self) -> &Arc<dyn ArchiveBackend> {
        &self.backend
    }

    /// Archive up to `target`. Returns the number of blocks archived.
    pub async fn archive(
        &self,
        target: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, ArchiveError> {
        let node_status = self.node.archive_status().await?;
        let window = node_window(&node_status, target)?;

        let mut store = self.backend.get_archived_status().await?;
        if store.code == StoreStatusCode::GenesisNotExists {
            info!(
                "[lc-04] Registering genesis with {} backend",
                self.backend.name()
            );
            let genesis = self.node.block_with_rwset(0).await?;
            self.backend.register(&genesis).await?;
            store = self.backend.get_archived_status().await?;
            if store.code == StoreStatusCode::GenesisNotExists {
                return Err(ArchiveError::Remote {
                    height: 0,
                    message: "genesis registration not visible".to_string(),
                });
            }
        }
        let window = reconcile(window, &store)?;
        info!(
            "[lc-04] Archiving [{}, {}] to {} backend",
            window.begin,
            window.end,
            self.backend.name()
        );

        let mut blocks = NodeBlockIterator::new(self.node.clone(), window);
        let mut archived = 0u64;
        let mut counting = |p: ArchiveProgress| {
            if p.is_ok() {
                archived += 1;
            }
            progress(p)
        };
        let result = self
            .backend
            .archive_blocks(&mut blocks, &mut counting)
            .await;
        blocks.release();

        if let Err(e) = result {
            error!("[lc-04] Archive aborted: {}", e);
            return Err(e);
        }
        if archived == 0 {
            return Err(ArchiveError::NothingToArchive {
                begin: window.begin,
                end: window.end,
            });
        }
        Ok(archived)
    }

    /// Restore from the pivot down to `target`. Returns the number of blocks
    /// restored.
    pub async fn restore(
        &self,
        target: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, ArchiveError> {
        let status = self.node.archive_status().await?;
        let heights = restore_heights(&status, target)?;
        let total = heights.len() as u64;
        if heights.is_empty() {
            debug!("[lc-04] Heights {}..={} already restored", target, status.pivot);
            return Ok(0);
        }
        info!(
            "[lc-04] Restoring {} blocks from {} down to {}",
            total, status.pivot, target
        );

        for height in heights {
            match self.restore_one(height).await {
                Ok(()) => progress(ArchiveProgress::ok(height, total)),
                Err(e) => {
                    error!("[lc-04] Restore aborted at {}: {}", height, e);
                    progress(ArchiveProgress::failed(height, total, e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(total)
    }

    async fn restore_one(&self, height: u64) -> Result<(), ArchiveError> {
        let block = BlockWithRwSet::from(self.backend.get_block_by_height(height, true).await?);
        if block.height() != height {
            return Err(ArchiveError::Remote {
                height,
                message: format!("backend returned block {}", block.height()),
            });
        }
        self.node.restore_block(&block).await
    }
}
