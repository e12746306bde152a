//! # gRPC Archive Service Backend
//!
//! Talks to the archive service over the generic tonic client, like the node
//! channels do. Two write modes:
//!
//! - **stream** (`ArchiveBlocks`): one bidirectional stream per run, the next
//!   block is sent only after the previous one is acknowledged
//! - **single write** (`SingleArchiveBlocks`): open, send one block, close,
//!   read the reply; one exchange per block
//!
//! Every call is capped by `requestSecondLimit`.

use crate::config::ArchiveCenterConfig;
use crate::domain::ArchiveError;
use crate::ports::outbound::block_info;
use crate::ports::{ArchiveBackend, BlockIterator, ProgressFn};
use async_trait::async_trait;
use http::uri::PathAndQuery;
use lc_01_connection_pool::adapters::grpc::map_status;
use lc_01_connection_pool::config::MIB;
use lc_01_connection_pool::{ClientIdentity, GrpcConnector, PoolConfig};
use shared_types::proto::{
    ArchiveBlockRequest, ArchiveBlockResponse, ArchiveCode, ArchiveStatusRequest,
    ArchiveStatusResponse, BlockByHashRequest, BlockByHeightRequest, BlockByTxIdRequest,
    BlockInfo, BlockWithRwSet, BlockWithRwSetResponse, ChainConfig, ChainConfigByHeightRequest,
    ChainConfigResponse, RegisterRequest, RegisterResponse, SingleArchiveBlockResponse,
    TransactionInfo, TransactionInfoWithRwSet, TransactionResponse, TransactionWithRwSetResponse,
    TxByTxIdRequest,
};
use shared_types::{ArchiveProgress, NodeDescriptor, StoreArchiveStatus};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

pub const REGISTER_PATH: &str = "/archivecenter.ArchiveCenterServer/Register";
pub const ARCHIVE_BLOCKS_PATH: &str = "/archivecenter.ArchiveCenterServer/ArchiveBlocks";
pub const SINGLE_ARCHIVE_BLOCKS_PATH: &str =
    "/archivecenter.ArchiveCenterServer/SingleArchiveBlocks";
pub const ARCHIVED_STATUS_PATH: &str = "/archivecenter.ArchiveCenterServer/GetArchivedStatus";
pub const BLOCK_BY_HEIGHT_PATH: &str = "/archivecenter.ArchiveCenterServer/GetBlockByHeight";
pub const BLOCK_BY_HASH_PATH: &str = "/archivecenter.ArchiveCenterServer/GetBlockByHash";
pub const BLOCK_BY_TX_ID_PATH: &str = "/archivecenter.ArchiveCenterServer/GetBlockByTxId";
pub const TX_BY_TX_ID_PATH: &str = "/archivecenter.ArchiveCenterServer/GetTxByTxId";
pub const TX_WITH_RWSET_PATH: &str = "/archivecenter.ArchiveCenterServer/GetTxWithRWSetByTxId";
pub const CHAIN_CONFIG_PATH: &str =
    "/archivecenter.ArchiveCenterServer/GetChainConfigByBlockHeight";

/// Report `error` as the outcome of `height` and hand it back.
fn fail(progress: &mut ProgressFn<'_>, height: u64, total: u64, error: ArchiveError) -> ArchiveError {
    progress(ArchiveProgress::failed(height, total, error.to_string()));
    error
}

/// Map a service reply code to an error. `height` names the block involved.
pub fn check_code(code: i32, message: &str, height: u64) -> Result<(), ArchiveError> {
    match ArchiveCode::try_from(code) {
        Ok(ArchiveCode::Ok) => Ok(()),
        Ok(ArchiveCode::Busy) => Err(ArchiveError::Busy(message.to_string())),
        Ok(ArchiveCode::NotFound) => Err(ArchiveError::NotFound(message.to_string())),
        _ => Err(ArchiveError::Remote {
            height,
            message: format!("code {}: {}", code, message),
        }),
    }
}

pub struct GrpcArchiveBackend {
    channel: Channel,
    chain_unique: String,
    single_write: bool,
    call_timeout: Duration,
    max_send: usize,
    max_recv: usize,
}

impl GrpcArchiveBackend {
    /// Lazily connected backend; nothing is dialed until the first call.
    pub fn connect(config: &ArchiveCenterConfig) -> Result<Self, ArchiveError> {
        let bytes = |mib: usize, field: &str| {
            mib.checked_mul(MIB)
                .ok_or_else(|| ArchiveError::Config(format!("{} of {} MiB overflows", field, mib)))
        };
        let pool_config = PoolConfig {
            max_send_msg_size: bytes(config.max_send_msg_size, "maxSendMsgSize")?,
            max_recv_msg_size: bytes(config.max_recv_msg_size, "maxRecvMsgSize")?,
            ..PoolConfig::default()
        };
        let descriptor = NodeDescriptor {
            index: 0,
            address: config.rpc_address.clone(),
            conn_count: 1,
            enable_tls: config.tls_enable,
            trust_root_paths: config.tls.trust_ca_list.iter().map(PathBuf::from).collect(),
            trust_roots: Vec::new(),
            tls_host_name: config.tls.server_name.clone(),
        };

        let mut connector = GrpcConnector::new(pool_config);
        if config.tls_enable && !config.tls.cert_file.is_empty() {
            let read = |path: &str| {
                std::fs::read(path)
                    .map_err(|e| ArchiveError::Config(format!("read {}: {}", path, e)))
            };
            connector = connector.with_identity(ClientIdentity {
                cert_pem: read(&config.tls.cert_file)?,
                key_pem: read(&config.tls.key_file)?,
            });
        }
        let endpoint = connector
            .endpoint(&descriptor)
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        info!(
            "[lc-04] Archive service at {} (tls={}, single_write={})",
            config.rpc_address, config.tls_enable, config.single_write
        );
        Ok(Self::from_channel(endpoint.connect_lazy(), config))
    }

    pub fn from_channel(channel: Channel, config: &ArchiveCenterConfig) -> Self {
        Self {
            channel,
            chain_unique: config.chain_genesis_hash.clone(),
            single_write: config.single_write,
            call_timeout: config.call_timeout(),
            max_send: config.max_send_msg_size.saturating_mul(MIB),
            max_recv: config.max_recv_msg_size.saturating_mul(MIB),
        }
    }

    fn grpc(&self) -> Grpc<Channel> {
        Grpc::new(self.channel.clone())
            .max_encoding_message_size(self.max_send)
            .max_decoding_message_size(self.max_recv)
    }

    fn elapsed(&self, path: &str) -> ArchiveError {
        ArchiveError::Timeout(format!("{} after {:?}", path, self.call_timeout))
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, ArchiveError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.grpc();
        let timeout = self.call_timeout;
        let call = async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service not ready: {}", e)))?;
            let mut req = tonic::Request::new(request);
            req.set_timeout(timeout);
            let codec = ProstCodec::<Req, Resp>::default();
            grpc.unary(req, PathAndQuery::from_static(path), codec).await
        };
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(map_status(&status).into()),
            Err(_) => Err(self.elapsed(path)),
        }
    }

    async fn single_write(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        let height = block.height();
        let request = ArchiveBlockRequest {
            chain_unique: self.chain_unique.clone(),
            block: Some(block.clone()),
        };
        let mut grpc = self.grpc();
        let call = async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service not ready: {}", e)))?;
            let codec = ProstCodec::<ArchiveBlockRequest, SingleArchiveBlockResponse>::default();
            grpc.client_streaming(
                tonic::Request::new(tokio_stream::iter(vec![request])),
                PathAndQuery::from_static(SINGLE_ARCHIVE_BLOCKS_PATH),
                codec,
            )
            .await
        };
        let reply = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => return Err(map_status(&status).into()),
            Err(_) => return Err(self.elapsed(SINGLE_ARCHIVE_BLOCKS_PATH)),
        };
        check_code(reply.code, &reply.message, height)?;
        debug!(
            "[lc-04] Single write of {} acknowledged [{}, {}]",
            height, reply.archived_begin, reply.archived_end
        );
        Ok(())
    }

    /// Acknowledged stream: one block in flight at a time.
    async fn stream_blocks(
        &self,
        blocks: &mut dyn BlockIterator,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        let total = blocks.total();

        // The first block goes in before the call so servers that hold their
        // headers until data arrives do not stall the handshake.
        let first = match blocks.next().await {
            None => return Ok(()),
            Some(Err(e)) => return Err(fail(progress, blocks.current(), total, e)),
            Some(Ok(block)) => block,
        };
        let mut height = blocks.current();
        let (sender, receiver) = mpsc::channel(1);
        let request = |block: BlockWithRwSet| ArchiveBlockRequest {
            chain_unique: self.chain_unique.clone(),
            block: Some(block),
        };
        if sender.send(request(first)).await.is_err() {
            return Err(fail(progress, height, total, ArchiveError::Transport("stream closed".into())));
        }

        let mut grpc = self.grpc();
        let open = async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service not ready: {}", e)))?;
            let codec = ProstCodec::<ArchiveBlockRequest, ArchiveBlockResponse>::default();
            grpc.streaming(
                tonic::Request::new(ReceiverStream::new(receiver)),
                PathAndQuery::from_static(ARCHIVE_BLOCKS_PATH),
                codec,
            )
            .await
        };
        let mut acks = match tokio::time::timeout(self.call_timeout, open).await {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => return Err(fail(progress, height, total, map_status(&status).into())),
            Err(_) => return Err(fail(progress, height, total, self.elapsed(ARCHIVE_BLOCKS_PATH))),
        };

        loop {
            let acked = match tokio::time::timeout(self.call_timeout, acks.message()).await {
                Ok(Ok(Some(ack))) => check_code(ack.code, &ack.message, height),
                Ok(Ok(None)) => Err(ArchiveError::Transport(format!(
                    "stream closed before acknowledging {}",
                    height
                ))),
                Ok(Err(status)) => Err(map_status(&status).into()),
                Err(_) => Err(self.elapsed(ARCHIVE_BLOCKS_PATH)),
            };
            if let Err(e) = acked {
                warn!("[lc-04] Archive stream failed at {}: {}", height, e);
                return Err(fail(progress, height, total, e));
            }
            progress(ArchiveProgress::ok(height, total));

            let block = match blocks.next().await {
                None => break,
                Some(Err(e)) => return Err(fail(progress, blocks.current(), total, e)),
                Some(Ok(block)) => block,
            };
            height = blocks.current();
            if sender.send(request(block)).await.is_err() {
                return Err(fail(progress, height, total, ArchiveError::Transport("stream closed".into())));
            }
        }
        drop(sender);
        Ok(())
    }

    fn block_reply(
        path: &'static str,
        reply: Result<BlockWithRwSetResponse, ArchiveError>,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let reply = reply?;
        check_code(reply.code, &reply.message, height)?;
        reply
            .block_data
            .map(|block| block_info(block, with_rwset))
            .ok_or_else(|| ArchiveError::NotFound(format!("{} returned no block", path)))
    }
}

#[async_trait]
impl ArchiveBackend for GrpcArchiveBackend {
    fn name(&self) -> &'static str {
        "grpc"
    }

    async fn register(&self, genesis: &BlockWithRwSet) -> Result<(), ArchiveError> {
        let reply: RegisterResponse = self
            .unary(
                REGISTER_PATH,
                RegisterRequest {
                    genesis: Some(genesis.clone()),
                },
            )
            .await?;
        check_code(reply.code, &reply.message, genesis.height())
    }

    async fn archive_block(&self, block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        self.single_write(block).await
    }

    async fn archive_blocks(
        &self,
        blocks: &mut dyn BlockIterator,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        if !self.single_write {
            return self.stream_blocks(blocks, progress).await;
        }
        let total = blocks.total();
        while let Some(next) = blocks.next().await {
            let height = blocks.current();
            let outcome = match next {
                Ok(block) => self.single_write(&block).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                progress(ArchiveProgress::failed(height, total, e.to_string()));
                return Err(e);
            }
            progress(ArchiveProgress::ok(height, total));
        }
        Ok(())
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let reply = self
            .unary(
                BLOCK_BY_HEIGHT_PATH,
                BlockByHeightRequest {
                    chain_unique: self.chain_unique.clone(),
                    height,
                    with_rwset,
                },
            )
            .await;
        Self::block_reply(BLOCK_BY_HEIGHT_PATH, reply, height, with_rwset)
    }

    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let reply = self
            .unary(
                BLOCK_BY_HASH_PATH,
                BlockByHashRequest {
                    chain_unique: self.chain_unique.clone(),
                    block_hash: block_hash.to_string(),
                    with_rwset,
                },
            )
            .await;
        Self::block_reply(BLOCK_BY_HASH_PATH, reply, 0, with_rwset)
    }

    async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let reply = self
            .unary(
                BLOCK_BY_TX_ID_PATH,
                BlockByTxIdRequest {
                    chain_unique: self.chain_unique.clone(),
                    tx_id: tx_id.to_string(),
                    with_rwset,
                },
            )
            .await;
        Self::block_reply(BLOCK_BY_TX_ID_PATH, reply, 0, with_rwset)
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ArchiveError> {
        let reply: TransactionResponse = self
            .unary(
                TX_BY_TX_ID_PATH,
                TxByTxIdRequest {
                    chain_unique: self.chain_unique.clone(),
                    tx_id: tx_id.to_string(),
                },
            )
            .await?;
        check_code(reply.code, &reply.message, 0)?;
        reply
            .info
            .ok_or_else(|| ArchiveError::NotFound(format!("transaction {}", tx_id)))
    }

    async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ArchiveError> {
        let reply: TransactionWithRwSetResponse = self
            .unary(
                TX_WITH_RWSET_PATH,
                TxByTxIdRequest {
                    chain_unique: self.chain_unique.clone(),
                    tx_id: tx_id.to_string(),
                },
            )
            .await?;
        check_code(reply.code, &reply.message, 0)?;
        reply
            .info
            .ok_or_else(|| ArchiveError::NotFound(format!("transaction {}", tx_id)))
    }

    async fn get_chain_config_by_block_height(
        &self,
        height: u64,
    ) -> Result<ChainConfig, ArchiveError> {
        let reply: ChainConfigResponse = self
            .unary(
                CHAIN_CONFIG_PATH,
                ChainConfigByHeightRequest {
                    chain_unique: self.chain_unique.clone(),
                    height,
                },
            )
            .await?;
        check_code(reply.code, &reply.message, height)?;
        reply
            .config
            .ok_or_else(|| ArchiveError::NotFound(format!("chain config at {}", height)))
    }

    async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ArchiveError> {
        let reply: ArchiveStatusResponse = self
            .unary(
                ARCHIVED_STATUS_PATH,
                ArchiveStatusRequest {
                    chain_unique: self.chain_unique.clone(),
                },
            )
            .await?;
        if reply.code == ArchiveCode::GenesisNotExists as i32 {
            return Ok(StoreArchiveStatus::genesis_not_exists());
        }
        check_code(reply.code, &reply.message, reply.archived_height)?;
        Ok(StoreArchiveStatus::ok(
            reply.archived_height,
            reply.in_archive,
        ))
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        debug!("[lc-04] Closing archive service channel");
        Ok(())
    }
}
