//! The node side of the archive pipeline (lc-04), over the request
//! dispatcher.

use crate::errors::ClientError;
use crate::request::system::{self, archive, chain_query, params};
use crate::request::RequestDispatcher;
use async_trait::async_trait;
use lc_04_archive::{ArchiveError, ArchiveNode};
use shared_types::proto::{self, ArchiveStatus, BlockInfo, BlockWithRwSet, KeyValuePair, TxType};
use shared_types::{ErrorKind, NodeArchiveStatus};
use std::sync::Arc;
use tracing::debug;

pub struct PoolArchiveNode {
    requests: Arc<RequestDispatcher>,
}

impl PoolArchiveNode {
    pub fn new(requests: Arc<RequestDispatcher>) -> Self {
        Self { requests }
    }
}

/// Node failures at `height` in the archive pipeline's terms.
fn archive_error(e: ClientError, height: u64) -> ArchiveError {
    match e {
        ClientError::Archive(e) => e,
        ClientError::Rejected { code, message, .. } => ArchiveError::Remote {
            height,
            message: format!("{:?}: {}", code, message),
        },
        ClientError::Decode(message) => ArchiveError::Decode(message),
        other if other.kind() == ErrorKind::Timeout => ArchiveError::Timeout(other.to_string()),
        other => ArchiveError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ArchiveNode for PoolArchiveNode {
    async fn archive_status(&self) -> Result<NodeArchiveStatus, ArchiveError> {
        let status: ArchiveStatus = self
            .requests
            .query_system(system::ARCHIVE_MANAGE, archive::GET_ARCHIVE_STATUS, Vec::new())
            .await
            .map_err(|e| archive_error(e, 0))?;
        Ok(status.into())
    }

    async fn block_with_rwset(&self, height: u64) -> Result<BlockWithRwSet, ArchiveError> {
        let block: BlockInfo = self
            .requests
            .query_system(
                system::CHAIN_QUERY,
                chain_query::GET_BLOCK_BY_HEIGHT,
                vec![
                    KeyValuePair::new(params::BLOCK_HEIGHT, height.to_string()),
                    KeyValuePair::new(params::WITH_RWSET, system::flag(true)),
                ],
            )
            .await
            .map_err(|e| archive_error(e, height))?;
        if block.block.is_none() || block.height() != height {
            return Err(ArchiveError::Remote {
                height,
                message: format!("node returned block {}", block.height()),
            });
        }
        Ok(block.into())
    }

    async fn restore_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        let height = block.height();
        let payload = self
            .requests
            .payload(TxType::Archive, system::ARCHIVE_MANAGE, archive::RESTORE_BLOCK)
            .parameter(params::FULL_BLOCK, proto::encode(block))
            .build();
        let request = self
            .requests
            .sign(payload)
            .map_err(|e| archive_error(e, height))?;
        let response = self
            .requests
            .send(&request, None)
            .await
            .map_err(|e| archive_error(e, height))?;
        if !response.is_success() {
            return Err(ArchiveError::Remote {
                height,
                message: format!("{:?}: {}", response.code(), response.message),
            });
        }
        debug!("[ledger-client] Restored block {}", height);
        Ok(())
    }
}
