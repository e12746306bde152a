//! One independent connection pool per node.

use crate::ports::QueryFetcher;
use async_trait::async_trait;
use lc_01_connection_pool::{ConnectionPool, NodeConnector, PoolConfig, PoolError};
use shared_types::proto::{TxRequest, TxResponse};
use shared_types::NodeDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct PoolFetcher {
    pools: Vec<Arc<ConnectionPool>>,
}

impl PoolFetcher {
    pub fn new(pools: Vec<Arc<ConnectionPool>>) -> Self {
        Self { pools }
    }

    /// Build a single-node pool for every descriptor.
    pub fn for_nodes(
        nodes: &[NodeDescriptor],
        config: &PoolConfig,
        connector: Arc<dyn NodeConnector>,
    ) -> Result<Self, PoolError> {
        let pools = nodes
            .iter()
            .map(|node| {
                ConnectionPool::new(vec![node.clone()], config.clone(), connector.clone())
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pools })
    }

    pub async fn close(&self) {
        for pool in &self.pools {
            pool.close().await;
        }
    }
}

#[async_trait]
impl QueryFetcher for PoolFetcher {
    fn node_count(&self) -> usize {
        self.pools.len()
    }

    async fn fetch(
        &self,
        node: usize,
        request: &TxRequest,
        timeout: Duration,
    ) -> Option<TxResponse> {
        let pool = self.pools.get(node)?;
        match pool.send_request(request, timeout).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("[lc-03] Node {} gave no answer: {}", node, e);
                None
            }
        }
    }
}
