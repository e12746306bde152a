//! # Session
//!
//! Holds the subsystem instances for one chain and exposes the client API.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: validate the configuration
//! Phase 2: security context and signer
//! Phase 3: archive backend (archiveCenter, else archive, else none)
//! Phase 4: connection pool, request dispatcher, canonical fetchers
//! Phase 5: tx result dispatcher (subscribes through the pool)
//! ```
//!
//! A failure in a later phase closes what the earlier phases opened.
//!
//! ## Reads and the archive
//!
//! Block and transaction reads go to the node first. A node answering
//! `ArchivedBlock` / `ArchivedTx` is retried against the archive backend.
//! With `archiveCenterQueryFirst` the order is reversed.

use crate::adapters::{PoolArchiveNode, PoolBlockSource};
use crate::container::config::ClientConfig;
use crate::errors::ClientError;
use crate::identity::{build_signer, tls_identity};
use crate::request::system::{self, archive, chain_config, chain_query, params};
use crate::request::{Deadlines, PayloadBuilder, RequestDispatcher};
use lc_01_connection_pool::{ConnectionPool, GrpcConnector, NodeConnector};
use lc_02_tx_dispatcher::{DispatcherConfig, TxResultDispatcher, Waiter};
use lc_03_canonical_query::{CanonicalQueryService, PoolFetcher};
use lc_04_archive::{
    AnyArchiveBackend, ArchiveBackend, ArchiveError, ArchivePipeline, ProgressFn,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_crypto::{ExternalSigner, SecurityContext, Signer};
use shared_types::proto::{
    ArchiveStatus, BlockInfo, ChainConfig, KeyValuePair, Payload, TransactionInfo,
    TransactionInfoWithRwSet, TxRequest, TxResponse, TxResult, TxType,
};
use shared_types::{NodeArchiveStatus, StoreArchiveStatus};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Assembles a [`Session`]. Anything not injected is built from the config.
pub struct SessionBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn NodeConnector>>,
    signer: Option<Arc<dyn Signer>>,
    external_signer: Option<Arc<dyn ExternalSigner>>,
    archive: Option<Arc<dyn ArchiveBackend>>,
    dispatcher_config: DispatcherConfig,
    slot_seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connector: None,
            signer: None,
            external_signer: None,
            archive: None,
            dispatcher_config: DispatcherConfig::default(),
            slot_seed: None,
        }
    }

    /// Dial nodes through `connector` instead of gRPC.
    pub fn with_connector(mut self, connector: Arc<dyn NodeConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sign with `signer` instead of the configured identity.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Key service used when `pkcs11` or `kms` is enabled.
    pub fn with_external_signer(mut self, signer: Arc<dyn ExternalSigner>) -> Self {
        self.external_signer = Some(signer);
        self
    }

    /// Use `backend` instead of the configured archive sections.
    pub fn with_archive_backend(mut self, backend: Arc<dyn ArchiveBackend>) -> Self {
        self.archive = Some(backend);
        self
    }

    pub fn with_dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher_config = config;
        self
    }

    /// Shuffle pool slots from a fixed seed instead of the thread rng.
    pub fn with_slot_seed(mut self, seed: u64) -> Self {
        self.slot_seed = Some(seed);
        self
    }

    #[instrument(name = "session_init", skip(self), fields(chain = %self.config.chain_id))]
    pub async fn build(self) -> Result<Session, ClientError> {
        let config = self.config;
        info!("[ledger-client] Building session");

        info!("[ledger-client] Phase 1: validating configuration");
        config.validate()?;

        info!("[ledger-client] Phase 2: security context and signer");
        let mut security = SecurityContext::new(config.pkcs11.clone(), config.kms.clone());
        if let Some(external) = self.external_signer {
            security = security.with_external_signer(external);
        }
        let signer = match self.signer {
            Some(signer) => signer,
            None => build_signer(&config, &security)?,
        };

        info!("[ledger-client] Phase 3: archive backend");
        let archive = match self.archive {
            Some(backend) => Some(backend),
            None => open_archive(&config).await?,
        };
        if let Some(backend) = &archive {
            info!("[ledger-client]   {} archive backend ready", backend.name());
        }

        info!("[ledger-client] Phase 4: connection pool");
        let pool_config = config.pool_config();
        let connector: Arc<dyn NodeConnector> = match self.connector {
            Some(connector) => connector,
            None => {
                let mut grpc = GrpcConnector::new(pool_config.clone());
                if let Some(identity) = tls_identity(&config)? {
                    grpc = grpc.with_identity(identity);
                }
                Arc::new(grpc)
            }
        };
        let descriptors = config.node_descriptors();
        let built = match self.slot_seed {
            Some(seed) => ConnectionPool::with_rng(
                descriptors.clone(),
                pool_config.clone(),
                connector.clone(),
                &mut StdRng::seed_from_u64(seed),
            ),
            None => ConnectionPool::new(descriptors.clone(), pool_config.clone(), connector.clone()),
        };
        let pool = match built {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                close_archive(&archive).await;
                return Err(e.into());
            }
        };
        info!("[ledger-client]   {} nodes in pool", descriptors.len());

        let deadlines = Deadlines {
            send_tx: config.rpc_client.send_tx_timeout(),
            get_tx: config.rpc_client.get_tx_timeout(),
        };
        let mut requests = RequestDispatcher::new(
            config.chain_id.clone(),
            config.tx_id_scheme(),
            signer,
            pool.clone(),
            deadlines,
        );

        let mut fetcher = None;
        if config.enable_sync_canonical_tx_result {
            match PoolFetcher::for_nodes(&descriptors, &pool_config, connector) {
                Ok(pools) => {
                    let pools = Arc::new(pools);
                    requests = requests.with_canonical(CanonicalQueryService::new(
                        pools.clone(),
                        config.quorum_config(),
                    ));
                    fetcher = Some(pools);
                    info!("[ledger-client]   canonical queries enabled");
                }
                Err(e) => {
                    pool.close().await;
                    close_archive(&archive).await;
                    return Err(e.into());
                }
            }
        }
        let requests = Arc::new(requests);

        let mut results = None;
        if config.enable_tx_result_dispatcher {
            info!("[ledger-client] Phase 5: tx result dispatcher");
            let source = Arc::new(PoolBlockSource::new(requests.clone()));
            let dispatcher = Arc::new(TxResultDispatcher::new(source, self.dispatcher_config));
            if let Err(e) = dispatcher.start().await {
                warn!("[ledger-client] Tx result dispatcher failed to start: {}", e);
                pool.close().await;
                if let Some(fetcher) = &fetcher {
                    fetcher.close().await;
                }
                close_archive(&archive).await;
                return Err(e.into());
            }
            results = Some(dispatcher);
        }

        info!("[ledger-client] Session ready");
        Ok(Session {
            config,
            security: Arc::new(security),
            requests,
            fetcher,
            results,
            archive,
            closed: AtomicBool::new(false),
        })
    }
}

/// `archiveCenter` wins when both archive sections are present.
async fn open_archive(
    config: &ClientConfig,
) -> Result<Option<Arc<dyn ArchiveBackend>>, ClientError> {
    if let Some(center) = &config.archive_center {
        return Ok(Some(Arc::new(AnyArchiveBackend::archive_center(center)?)));
    }
    if let Some(sql) = &config.archive {
        return Ok(Some(Arc::new(
            AnyArchiveBackend::mysql(sql, &config.chain_id).await?,
        )));
    }
    Ok(None)
}

async fn close_archive(archive: &Option<Arc<dyn ArchiveBackend>>) {
    if let Some(backend) = archive {
        if let Err(e) = backend.close().await {
            warn!("[ledger-client] Closing {} archive backend: {}", backend.name(), e);
        }
    }
}

/// Copy a committed result into the response returned to the caller.
fn merge_result(response: &mut TxResponse, result: TxResult, height: u64, timestamp: i64) {
    response.code = result.code;
    if !result.message.is_empty() {
        response.message = result.message;
    }
    response.contract_result = result.contract_result;
    response.tx_block_height = height;
    response.tx_timestamp = timestamp;
}

/// Client session for one chain. Safe to share across tasks.
pub struct Session {
    config: ClientConfig,
    security: Arc<SecurityContext>,
    requests: Arc<RequestDispatcher>,
    fetcher: Option<Arc<PoolFetcher>>,
    results: Option<Arc<TxResultDispatcher>>,
    archive: Option<Arc<dyn ArchiveBackend>>,
    closed: AtomicBool,
}

impl Session {
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        SessionBuilder::new(config).build().await
    }

    pub fn builder(config: ClientConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn chain_id(&self) -> &str {
        self.requests.chain_id()
    }

    pub fn security(&self) -> &Arc<SecurityContext> {
        &self.security
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        self.requests.signer()
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        self.requests.pool()
    }

    pub fn dispatcher(&self) -> Option<&Arc<TxResultDispatcher>> {
        self.results.as_ref()
    }

    pub fn archive_backend(&self) -> Option<&Arc<dyn ArchiveBackend>> {
        self.archive.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }

    /// Payload builder scoped to this session's chain and tx id scheme.
    pub fn payload(
        &self,
        tx_type: TxType,
        contract: impl Into<String>,
        method: impl Into<String>,
    ) -> PayloadBuilder {
        self.requests.payload(tx_type, contract, method)
    }

    pub fn sign(&self, payload: Payload) -> Result<TxRequest, ClientError> {
        self.requests.sign(payload)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a signed request as is.
    pub async fn send_request(
        &self,
        request: &TxRequest,
        timeout: Option<Duration>,
    ) -> Result<TxResponse, ClientError> {
        self.ensure_open()?;
        self.requests.send(request, timeout).await
    }

    /// Send a transaction. With `with_sync_result` the call also waits for
    /// the transaction to land in a block and returns its execution result.
    pub async fn send_tx_request(
        &self,
        request: &TxRequest,
        timeout: Option<Duration>,
        with_sync_result: bool,
    ) -> Result<TxResponse, ClientError> {
        self.ensure_open()?;
        let tx_id = request.tx_id().to_string();
        let waiter = match &self.results {
            Some(results) if with_sync_result => Some(results.register(&tx_id)),
            _ => None,
        };

        let outcome = self
            .send_and_wait(request, timeout, with_sync_result, waiter)
            .await;

        if let Some(results) = &self.results {
            if with_sync_result {
                results.unregister(&tx_id);
            }
        }
        outcome
    }

    async fn send_and_wait(
        &self,
        request: &TxRequest,
        timeout: Option<Duration>,
        with_sync_result: bool,
        waiter: Option<Arc<Waiter>>,
    ) -> Result<TxResponse, ClientError> {
        let mut response = self.requests.send(request, timeout).await?;
        if !with_sync_result || !response.is_success() {
            return Ok(response);
        }

        let tx_id = request.tx_id();
        match waiter {
            Some(waiter) => {
                let deadline =
                    timeout.unwrap_or_else(|| self.requests.default_timeout(request.kind()));
                let event = waiter.recv_timeout(deadline).await?;
                debug!(
                    tx_id,
                    height = event.block_height,
                    "[ledger-client] Result delivered by dispatcher"
                );
                merge_result(&mut response, event.result, event.block_height, event.timestamp);
            }
            None => {
                let info = self.poll_tx_result(tx_id).await?;
                let transaction = info.transaction.unwrap_or_default();
                let timestamp = transaction.timestamp();
                merge_result(
                    &mut response,
                    transaction.result.unwrap_or_default(),
                    info.block_height,
                    timestamp,
                );
            }
        }
        Ok(response)
    }

    /// Ask the node for `tx_id` up to `retryLimit` times.
    async fn poll_tx_result(&self, tx_id: &str) -> Result<TransactionInfo, ClientError> {
        let attempts = self.config.retry_limit;
        for attempt in 1..=attempts {
            match self.node_tx_by_tx_id(tx_id).await {
                Ok(info) => return Ok(info),
                Err(e) => debug!(tx_id, attempt, "[ledger-client] Tx not committed yet: {}", e),
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_interval()).await;
            }
        }
        Err(ClientError::SyncResultTimeout {
            tx_id: tx_id.to_string(),
            attempts,
        })
    }

    /// Build, sign and send an invoke.
    pub async fn invoke_contract(
        &self,
        contract: &str,
        method: &str,
        tx_id: Option<&str>,
        params: Vec<KeyValuePair>,
        timeout: Option<Duration>,
        with_sync_result: bool,
    ) -> Result<TxResponse, ClientError> {
        let mut builder = self
            .payload(TxType::InvokeContract, contract, method)
            .parameters(params);
        if let Some(tx_id) = tx_id {
            builder = builder.tx_id(tx_id);
        }
        let request = self.sign(builder.build())?;
        self.send_tx_request(&request, timeout, with_sync_result).await
    }

    /// Build, sign and send a query. The node's response is returned as is.
    pub async fn query_contract(
        &self,
        contract: &str,
        method: &str,
        params: Vec<KeyValuePair>,
        timeout: Option<Duration>,
    ) -> Result<TxResponse, ClientError> {
        let payload = self
            .payload(TxType::QueryContract, contract, method)
            .parameters(params)
            .build();
        let request = self.sign(payload)?;
        self.send_request(&request, timeout).await
    }

    // =========================================================================
    // Chain reads
    // =========================================================================

    async fn read_through<T, N, A>(
        &self,
        what: &str,
        node: N,
        archive: impl FnOnce(Arc<dyn ArchiveBackend>) -> A,
    ) -> Result<T, ClientError>
    where
        N: Future<Output = Result<T, ClientError>>,
        A: Future<Output = Result<T, ArchiveError>>,
    {
        self.ensure_open()?;
        match &self.archive {
            Some(backend) if self.config.archive_center_query_first => {
                match archive(backend.clone()).await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        debug!("[ledger-client] {} not in archive ({}), asking node", what, e);
                        node.await
                    }
                }
            }
            Some(backend) => match node.await {
                Err(e) if e.is_archived() => {
                    debug!("[ledger-client] {} archived, reading from {}", what, backend.name());
                    Ok(archive(backend.clone()).await?)
                }
                other => other,
            },
            None => match node.await {
                Err(e) if e.is_archived() => Err(ClientError::Archived(what.to_string())),
                other => other,
            },
        }
    }

    pub async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ClientError> {
        let node = self.requests.query_system(
            system::CHAIN_QUERY,
            chain_query::GET_BLOCK_BY_HEIGHT,
            vec![
                KeyValuePair::new(params::BLOCK_HEIGHT, height.to_string()),
                KeyValuePair::new(params::WITH_RWSET, system::flag(with_rwset)),
            ],
        );
        self.read_through(&format!("block {}", height), node, |b| async move {
            b.get_block_by_height(height, with_rwset).await
        })
        .await
    }

    /// `block_hash` is hex encoded.
    pub async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ClientError> {
        let node = self.requests.query_system(
            system::CHAIN_QUERY,
            chain_query::GET_BLOCK_BY_HASH,
            vec![
                KeyValuePair::new(params::BLOCK_HASH, block_hash),
                KeyValuePair::new(params::WITH_RWSET, system::flag(with_rwset)),
            ],
        );
        let hash = block_hash.to_string();
        self.read_through(&format!("block {}", block_hash), node, |b| async move {
            b.get_block_by_hash(&hash, with_rwset).await
        })
        .await
    }

    pub async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ClientError> {
        let node = self.requests.query_system(
            system::CHAIN_QUERY,
            chain_query::GET_BLOCK_BY_TX_ID,
            vec![
                KeyValuePair::new(params::TX_ID, tx_id),
                KeyValuePair::new(params::WITH_RWSET, system::flag(with_rwset)),
            ],
        );
        let id = tx_id.to_string();
        self.read_through(&format!("block of tx {}", tx_id), node, |b| async move {
            b.get_block_by_tx_id(&id, with_rwset).await
        })
        .await
    }

    async fn node_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ClientError> {
        self.requests
            .query_system(
                system::CHAIN_QUERY,
                chain_query::GET_TX_BY_TX_ID,
                vec![KeyValuePair::new(params::TX_ID, tx_id)],
            )
            .await
    }

    pub async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ClientError> {
        let id = tx_id.to_string();
        self.read_through(
            &format!("tx {}", tx_id),
            self.node_tx_by_tx_id(tx_id),
            |b| async move { b.get_tx_by_tx_id(&id).await },
        )
        .await
    }

    pub async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ClientError> {
        let node = self.requests.query_system(
            system::CHAIN_QUERY,
            chain_query::GET_TX_WITH_RWSET_BY_TX_ID,
            vec![KeyValuePair::new(params::TX_ID, tx_id)],
        );
        let id = tx_id.to_string();
        self.read_through(&format!("tx {}", tx_id), node, |b| async move {
            b.get_tx_with_rwset_by_tx_id(&id).await
        })
        .await
    }

    /// Chain configuration in force at `height`.
    pub async fn get_chain_config_by_block_height(
        &self,
        height: u64,
    ) -> Result<ChainConfig, ClientError> {
        let node = self.requests.query_system(
            system::CHAIN_CONFIG,
            chain_config::GET_CHAIN_CONFIG_AT,
            vec![KeyValuePair::new(params::BLOCK_HEIGHT, height.to_string())],
        );
        self.read_through(&format!("chain config at {}", height), node, |b| async move {
            b.get_chain_config_by_block_height(height).await
        })
        .await
    }

    pub async fn get_last_block(&self, with_rwset: bool) -> Result<BlockInfo, ClientError> {
        self.ensure_open()?;
        self.requests
            .query_system(
                system::CHAIN_QUERY,
                chain_query::GET_LAST_BLOCK,
                vec![KeyValuePair::new(params::WITH_RWSET, system::flag(with_rwset))],
            )
            .await
    }

    pub async fn get_current_block_height(&self) -> Result<u64, ClientError> {
        Ok(self.get_last_block(false).await?.height())
    }

    // =========================================================================
    // Archive
    // =========================================================================

    /// The node's archive state.
    pub async fn get_archive_status(&self) -> Result<NodeArchiveStatus, ClientError> {
        self.ensure_open()?;
        let status: ArchiveStatus = self
            .requests
            .query_system(system::ARCHIVE_MANAGE, archive::GET_ARCHIVE_STATUS, Vec::new())
            .await?;
        Ok(status.into())
    }

    /// The archive store's state.
    pub async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ClientError> {
        self.ensure_open()?;
        Ok(self.archive_backend_or_err()?.get_archived_status().await?)
    }

    fn archive_backend_or_err(&self) -> Result<&Arc<dyn ArchiveBackend>, ClientError> {
        self.archive
            .as_ref()
            .ok_or_else(|| ArchiveError::Config("no archive backend configured".into()).into())
    }

    fn pipeline(&self) -> Result<ArchivePipeline, ClientError> {
        let backend = self.archive_backend_or_err()?.clone();
        let node = Arc::new(PoolArchiveNode::new(self.requests.clone()));
        Ok(ArchivePipeline::new(node, backend))
    }

    /// Archive blocks up to `target`. Returns how many were archived.
    pub async fn archive_blocks(
        &self,
        target: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, ClientError> {
        self.ensure_open()?;
        Ok(self.pipeline()?.archive(target, progress).await?)
    }

    /// Feed archived blocks back to the node, from its pivot down to
    /// `target`. Returns how many were restored.
    pub async fn restore_blocks(
        &self,
        target: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, ClientError> {
        self.ensure_open()?;
        Ok(self.pipeline()?.restore(target, progress).await?)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stop the dispatcher and release every connection. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("[ledger-client] Closing session");
        if let Some(results) = &self.results {
            results.stop().await;
        }
        self.requests.pool().close().await;
        if let Some(fetcher) = &self.fetcher {
            fetcher.close().await;
        }
        close_archive(&self.archive).await;
    }
}
