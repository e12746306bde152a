//! Shared test fixtures.

use k256::pkcs8::LineEnding;
use lc_01_connection_pool::NodeConnector;
use lc_04_archive::{
    sample_block, ArchiveBackend, MemoryArchiveTable, SqlArchiveBackend, VecBlockIterator,
};
use ledger_client::{ClientConfig, Session, SessionBuilder};
use lc_02_tx_dispatcher::DispatcherConfig;
use shared_types::proto::{ContractResult, TxResponse};
use shared_types::ArchiveProgress;
use std::sync::Arc;

pub const CHAIN: &str = "chain1";
pub const SECRET: &str = "archive-secret";

pub type MemoryStore = SqlArchiveBackend<MemoryArchiveTable>;

/// Deterministic SEC1 signing key.
pub fn key_pem() -> String {
    k256::SecretKey::from_slice(&[11u8; 32])
        .unwrap()
        .to_sec1_pem(LineEnding::LF)
        .unwrap()
        .to_string()
}

/// Successful response tagged with `message`.
pub fn ok_response(message: &str) -> TxResponse {
    TxResponse {
        message: message.to_string(),
        ..Default::default()
    }
}

/// Successful response carrying `result`.
pub fn result_response(result: &[u8]) -> TxResponse {
    TxResponse {
        contract_result: Some(ContractResult {
            result: result.to_vec(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn config(nodes: &[&str]) -> ClientConfig {
    ClientConfig::for_testing(CHAIN, nodes, &key_pem())
}

pub async fn session_on(config: ClientConfig, connector: Arc<dyn NodeConnector>) -> Session {
    SessionBuilder::new(config)
        .with_connector(connector)
        .with_dispatcher_config(DispatcherConfig::for_testing())
        .build()
        .await
        .unwrap()
}

/// Session whose pool hands out a slot of node `first` before any other.
pub async fn session_led_by(
    config: ClientConfig,
    connector: Arc<dyn NodeConnector>,
    first: usize,
) -> Session {
    for seed in 0u64.. {
        let session = SessionBuilder::new(config.clone())
            .with_connector(connector.clone())
            .with_dispatcher_config(DispatcherConfig::for_testing())
            .with_slot_seed(seed)
            .build()
            .await
            .unwrap();
        if session.pool().slot_order().await[0].node == first {
            return session;
        }
        session.close().await;
    }
    unreachable!()
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(SqlArchiveBackend::new(MemoryArchiveTable::new(), CHAIN, SECRET))
}

/// Store holding genesis plus blocks `1..=height`.
pub async fn store_archived_to(height: u64) -> Arc<MemoryStore> {
    let store = memory_store();
    store.register(&sample_block(CHAIN, 0)).await.unwrap();
    if height > 0 {
        archive_range(&store, 1, height).await;
    }
    store
}

/// Write `begin..=end` straight into `store`.
pub async fn archive_range(store: &MemoryStore, begin: u64, end: u64) -> Vec<u64> {
    let mut blocks = VecBlockIterator::new((begin..=end).map(|h| sample_block(CHAIN, h)).collect());
    let mut seen = Vec::new();
    store
        .archive_blocks(&mut blocks, &mut |p: ArchiveProgress| seen.push(p.current_height))
        .await
        .unwrap();
    seen
}
