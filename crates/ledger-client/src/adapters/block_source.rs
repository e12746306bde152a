//! Block subscription for the tx result dispatcher (lc-02).

use crate::request::system::{self, chain_query, params, subscribe};
use crate::request::RequestDispatcher;
use async_trait::async_trait;
use futures::StreamExt;
use lc_02_tx_dispatcher::{BlockSource, BlockStream, DispatcherError};
use prost::Message;
use shared_types::proto::{BlockInfo, TxType};
use std::sync::Arc;
use tracing::debug;

pub struct PoolBlockSource {
    requests: Arc<RequestDispatcher>,
}

impl PoolBlockSource {
    pub fn new(requests: Arc<RequestDispatcher>) -> Self {
        Self { requests }
    }
}

fn source_error(e: impl std::fmt::Display) -> DispatcherError {
    DispatcherError::Source(e.to_string())
}

#[async_trait]
impl BlockSource for PoolBlockSource {
    async fn current_height(&self) -> Result<u64, DispatcherError> {
        let block: BlockInfo = self
            .requests
            .query_system(system::CHAIN_QUERY, chain_query::GET_LAST_BLOCK, Vec::new())
            .await
            .map_err(source_error)?;
        Ok(block.height())
    }

    async fn subscribe_blocks(&self, start: u64) -> Result<BlockStream, DispatcherError> {
        let payload = self
            .requests
            .payload(TxType::Subscribe, system::SUBSCRIBE_MANAGE, subscribe::SUBSCRIBE_BLOCK)
            .parameter(params::START_BLOCK, start.to_string())
            .parameter(params::END_BLOCK, "-1")
            .parameter(params::WITH_RWSET, system::flag(false))
            .parameter(params::ONLY_HEADER, system::flag(false))
            .build();
        let request = self.requests.sign(payload).map_err(source_error)?;
        let frames = self.requests.subscribe(&request).await.map_err(source_error)?;
        debug!("[ledger-client] Block subscription open from {}", start);

        Ok(frames
            .map(|frame| match frame {
                Ok(frame) => BlockInfo::decode(frame.data.as_slice())
                    .map_err(|e| DispatcherError::Source(format!("bad block frame: {}", e))),
                Err(status) => Err(source_error(status)),
            })
            .boxed())
    }
}
