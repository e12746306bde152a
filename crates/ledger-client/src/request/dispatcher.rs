//! # Request Dispatcher
//!
//! Signs and routes every request the session sends:
//!
//! ```text
//! query  ──► canonical quorum (lc-03) when enabled ─┐
//!        └─► connection pool (lc-01) ───────────────┴──► TxResponse
//! invoke ──► connection pool (lc-01)
//! ```

use super::builder::{sign_request, PayloadBuilder};
use crate::errors::ClientError;
use lc_01_connection_pool::{ConnectionPool, SubscriptionStream};
use lc_03_canonical_query::CanonicalQueryService;
use prost::Message;
use shared_crypto::{Signer, TxIdScheme};
use shared_types::proto::{KeyValuePair, Payload, TxRequest, TxResponse, TxType};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default deadlines by request type.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub send_tx: Duration,
    pub get_tx: Duration,
}

pub struct RequestDispatcher {
    chain_id: String,
    scheme: TxIdScheme,
    signer: Arc<dyn Signer>,
    pool: Arc<ConnectionPool>,
    canonical: Option<CanonicalQueryService>,
    deadlines: Deadlines,
}

impl RequestDispatcher {
    pub fn new(
        chain_id: impl Into<String>,
        scheme: TxIdScheme,
        signer: Arc<dyn Signer>,
        pool: Arc<ConnectionPool>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            scheme,
            signer,
            pool,
            canonical: None,
            deadlines,
        }
    }

    /// Route query-type requests through a quorum of nodes.
    pub fn with_canonical(mut self, canonical: CanonicalQueryService) -> Self {
        self.canonical = Some(canonical);
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical.is_some()
    }

    pub fn payload(
        &self,
        tx_type: TxType,
        contract: impl Into<String>,
        method: impl Into<String>,
    ) -> PayloadBuilder {
        PayloadBuilder::new(self.chain_id.clone(), tx_type, self.scheme).contract(contract, method)
    }

    pub fn sign(&self, payload: Payload) -> Result<TxRequest, ClientError> {
        Ok(sign_request(payload, self.signer.as_ref())?)
    }

    /// Deadline used when the caller gives none.
    pub fn default_timeout(&self, tx_type: TxType) -> Duration {
        match tx_type {
            TxType::QueryContract => self.deadlines.get_tx,
            _ => self.deadlines.send_tx,
        }
    }

    pub async fn send(
        &self,
        request: &TxRequest,
        timeout: Option<Duration>,
    ) -> Result<TxResponse, ClientError> {
        let kind = request.kind();
        let timeout = timeout.unwrap_or_else(|| self.default_timeout(kind));
        match (&self.canonical, kind) {
            (Some(canonical), TxType::QueryContract) => {
                debug!(tx_id = request.tx_id(), "[ledger-client] Canonical query");
                Ok(canonical.query_with_timeout(request, timeout).await?)
            }
            _ => Ok(self.pool.send_request(request, timeout).await?),
        }
    }

    /// Open a server-streaming subscription through the pool.
    pub async fn subscribe(&self, request: &TxRequest) -> Result<SubscriptionStream, ClientError> {
        Ok(self.pool.subscribe(request).await?)
    }

    /// Query a built-in contract and decode its result as `M`.
    pub async fn query_system<M: Message + Default>(
        &self,
        contract: &str,
        method: &str,
        params: Vec<KeyValuePair>,
    ) -> Result<M, ClientError> {
        let payload = self
            .payload(TxType::QueryContract, contract, method)
            .parameters(params)
            .build();
        let request = self.sign(payload)?;
        let response = self.send(&request, None).await?;
        decode_result(method, &response)
    }
}

/// Decode a successful response's contract result.
pub fn decode_result<M: Message + Default>(
    what: &str,
    response: &TxResponse,
) -> Result<M, ClientError> {
    if !response.is_success() {
        return Err(ClientError::Rejected {
            what: what.to_string(),
            code: response.code(),
            message: response.message.clone(),
        });
    }
    Ok(M::decode(response.result_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_01_connection_pool::{MockConnector, MockNodeScript, PoolConfig};
    use shared_crypto::{PublicKeySigner, Secp256k1KeyPair};
    use shared_types::proto::{self, BlockHeader, BlockInfo, Block, ContractResult, TxStatusCode};
    use shared_types::NodeDescriptor;

    fn dispatcher(script: MockNodeScript) -> (RequestDispatcher, MockConnector) {
        let connector = MockConnector::new().with_node("n:1", script);
        let pool = ConnectionPool::new(
            vec![NodeDescriptor::plain(0, "n:1")],
            PoolConfig::for_testing(),
            Arc::new(connector.clone()),
        )
        .unwrap();
        let pair = Arc::new(Secp256k1KeyPair::from_bytes([5u8; 32]).unwrap());
        let signer = Arc::new(PublicKeySigner::from_key_pair(pair).unwrap());
        let deadlines = Deadlines {
            send_tx: Duration::from_secs(1),
            get_tx: Duration::from_secs(1),
        };
        (
            RequestDispatcher::new("chain1", TxIdScheme::Random, signer, Arc::new(pool), deadlines),
            connector,
        )
    }

    fn block_response(height: u64) -> TxResponse {
        let block = BlockInfo {
            block: Some(Block {
                header: Some(BlockHeader {
                    block_height: height,
                    ..Default::default()
                }),
                txs: Vec::new(),
            }),
            rwset_list: Vec::new(),
        };
        TxResponse {
            contract_result: Some(ContractResult {
                result: proto::encode(&block),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_query_system_decodes_result() {
        let (dispatcher, connector) = dispatcher(MockNodeScript::responding(block_response(12)));
        let block: BlockInfo = dispatcher
            .query_system("CHAIN_QUERY", "GET_LAST_BLOCK", Vec::new())
            .await
            .unwrap();
        assert_eq!(block.height(), 12);
        assert_eq!(connector.calls("n:1"), 1);
    }

    #[tokio::test]
    async fn test_non_success_is_rejected() {
        let (dispatcher, _) = dispatcher(MockNodeScript::responding(TxResponse {
            code: TxStatusCode::ArchivedBlock as i32,
            message: "archived".into(),
            ..Default::default()
        }));
        let err = dispatcher
            .query_system::<BlockInfo>("CHAIN_QUERY", "GET_BLOCK_BY_HEIGHT", Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_archived());
    }

    #[test]
    fn test_payload_carries_chain_and_type() {
        let (dispatcher, _) = dispatcher(MockNodeScript::responding(TxResponse::default()));
        let payload = dispatcher
            .payload(TxType::QueryContract, "asset", "balance")
            .build();
        assert_eq!(payload.chain_id, "chain1");
        assert_eq!(payload.tx_type(), TxType::QueryContract);
        assert_eq!(dispatcher.default_timeout(TxType::Archive), Duration::from_secs(1));
        let request = dispatcher.sign(payload).unwrap();
        assert!(request.sender.is_some());
    }
}
