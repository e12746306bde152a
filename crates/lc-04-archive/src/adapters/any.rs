//! Closed set of archive backends chosen at session construction.

use super::grpc::GrpcArchiveBackend;
use super::http::HttpArchiveBackend;
use super::sql::{MemoryArchiveTable, MySqlArchiveTable, SqlArchiveBackend};
use crate::config::{ArchiveCenterConfig, SqlArchiveConfig};
use crate::domain::ArchiveError;
use crate::ports::{ArchiveBackend, BlockIterator, ProgressFn};
use async_trait::async_trait;
use shared_types::proto::{
    BlockInfo, BlockWithRwSet, ChainConfig, TransactionInfo, TransactionInfoWithRwSet,
};
use shared_types::StoreArchiveStatus;

pub enum AnyArchiveBackend {
    /// Archive service over gRPC.
    Grpc(GrpcArchiveBackend),
    /// Archive service HTTP gateway; reads only.
    Http(HttpArchiveBackend),
    MySql(SqlArchiveBackend<MySqlArchiveTable>),
    /// In-process store.
    Memory(SqlArchiveBackend<MemoryArchiveTable>),
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            AnyArchiveBackend::Grpc($backend) => $call,
            AnyArchiveBackend::Http($backend) => $call,
            AnyArchiveBackend::MySql($backend) => $call,
            AnyArchiveBackend::Memory($backend) => $call,
        }
    };
}

impl AnyArchiveBackend {
    /// gRPC when an RPC address is configured, HTTP otherwise.
    pub fn archive_center(config: &ArchiveCenterConfig) -> Result<Self, ArchiveError> {
        if !config.rpc_address.is_empty() {
            Ok(Self::Grpc(GrpcArchiveBackend::connect(config)?))
        } else {
            Ok(Self::Http(HttpArchiveBackend::new(config)?))
        }
    }

    pub async fn mysql(config: &SqlArchiveConfig, chain_id: &str) -> Result<Self, ArchiveError> {
        let table = MySqlArchiveTable::connect(config, chain_id).await?;
        Ok(Self::MySql(SqlArchiveBackend::new(
            table,
            chain_id,
            config.secret_key.clone(),
        )))
    }

    pub fn memory(chain_id: &str, secret_key: &str) -> Self {
        Self::Memory(SqlArchiveBackend::new(
            MemoryArchiveTable::new(),
            chain_id,
            secret_key,
        ))
    }
}

#[async_trait]
impl ArchiveBackend for AnyArchiveBackend {
    fn name(&self) -> &'static str {
        dispatch!(self, b => b.name())
    }

    async fn register(&self, genesis: &BlockWithRwSet) -> Result<(), ArchiveError> {
        dispatch!(self, b => b.register(genesis).await)
    }

    async fn archive_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        dispatch!(self, b => b.archive_block(block).await)
    }

    async fn archive_blocks(
        &self,
        blocks: &mut dyn BlockIterator,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        dispatch!(self, b => b.archive_blocks(blocks, progress).await)
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        dispatch!(self, b => b.get_block_by_height(height, with_rwset).await)
    }

    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        dispatch!(self, b => b.get_block_by_hash(block_hash, with_rwset).await)
    }

    async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        dispatch!(self, b => b.get_block_by_tx_id(tx_id, with_rwset).await)
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ArchiveError> {
        dispatch!(self, b => b.get_tx_by_tx_id(tx_id).await)
    }

    async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ArchiveError> {
        dispatch!(self, b => b.get_tx_with_rwset_by_tx_id(tx_id).await)
    }

    async fn get_chain_config_by_block_height(
        &self,
        height: u64,
    ) -> Result<ChainConfig, ArchiveError> {
        dispatch!(self, b => b.get_chain_config_by_block_height(height).await)
    }

    async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ArchiveError> {
        dispatch!(self, b => b.get_archived_status().await)
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        dispatch!(self, b => b.close().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::sample_block;

    #[tokio::test]
    async fn test_archive_center_picks_transport() {
        let config = ArchiveCenterConfig::for_testing();
        assert_eq!(
            AnyArchiveBackend::archive_center(&config).unwrap().name(),
            "grpc"
        );
        let mut config = ArchiveCenterConfig::for_testing();
        config.rpc_address.clear();
        assert_eq!(
            AnyArchiveBackend::archive_center(&config).unwrap().name(),
            "http"
        );
    }

    #[tokio::test]
    async fn test_memory_backend_delegates() {
        let backend = AnyArchiveBackend::memory("chain1", "secret");
        assert_eq!(backend.name(), "sql");
        backend.register(&sample_block("chain1", 0)).await.unwrap();
        backend.archive_block(&sample_block("chain1", 1)).await.unwrap();
        let status = backend.get_archived_status().await.unwrap();
        assert_eq!(status.archived_height, 1);
        assert_eq!(backend.get_block_by_height(1, true).await.unwrap().height(), 1);
    }
}
