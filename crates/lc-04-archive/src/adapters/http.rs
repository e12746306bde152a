//! Read-only HTTP gateway of the archive service.
//!
//! Requests are JSON; replies share one envelope,
//! `{"code": 0, "errorMsg": "", "data": ...}`, where `data` carries a
//! hex-encoded protobuf message (or a plain object for the status call).

use crate::config::ArchiveCenterConfig;
use crate::domain::ArchiveError;
use crate::ports::outbound::block_info;
use crate::ports::ArchiveBackend;
use async_trait::async_trait;
use prost::Message;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared_types::proto::{
    ArchiveCode, BlockInfo, BlockWithRwSet, ChainConfig, TransactionInfo,
    TransactionInfoWithRwSet,
};
use shared_types::StoreArchiveStatus;
use tracing::debug;

/// Reply envelope of every gateway call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse<T> {
    pub code: i32,
    #[serde(default)]
    pub error_msg: String,
    pub data: Option<T>,
}

impl<T> HttpResponse<T> {
    /// Payload of a successful reply; `what` names the request in errors.
    pub fn into_data(self, what: &str) -> Result<T, ArchiveError> {
        if self.code != ArchiveCode::Ok as i32 {
            return Err(ArchiveError::Remote {
                height: 0,
                message: format!("{}: code {}: {}", what, self.code, self.error_msg),
            });
        }
        self.data
            .ok_or_else(|| ArchiveError::NotFound(what.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedStatusData {
    pub archived_height: u64,
    #[serde(default)]
    pub in_archive: bool,
    #[serde(default)]
    pub code: i32,
}

pub fn decode_hex_message<M: Message + Default>(data: &str) -> Result<M, ArchiveError> {
    let bytes = hex::decode(data).map_err(|e| ArchiveError::Decode(e.to_string()))?;
    Ok(M::decode(bytes.as_slice())?)
}

pub struct HttpArchiveBackend {
    base: String,
    chain_genesis_hash: String,
    client: Client,
}

impl HttpArchiveBackend {
    pub fn new(config: &ArchiveCenterConfig) -> Result<Self, ArchiveError> {
        if config.http_url.is_empty() {
            return Err(ArchiveError::Config("archiveCenter.httpUrl is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.call_timeout())
            .build()
            .map_err(|e| ArchiveError::Config(e.to_string()))?;
        Ok(Self {
            base: config.http_url.trim_end_matches('/').to_string(),
            chain_genesis_hash: config.chain_genesis_hash.clone(),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        mut body: serde_json::Value,
    ) -> Result<HttpResponse<T>, ArchiveError> {
        body["chain_genesis_hash"] = serde_json::Value::from(self.chain_genesis_hash.clone());
        let url = self.url(path);
        debug!("[lc-04] POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(path, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ArchiveError::Transport(format!(
                "{} failed {} {}",
                path, status, text
            )));
        }
        resp.json::<HttpResponse<T>>()
            .await
            .map_err(|e| ArchiveError::Decode(format!("{}: {}", path, e)))
    }

    async fn message<M: Message + Default>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<M, ArchiveError> {
        let data: String = self.post(path, body).await?.into_data(path)?;
        decode_hex_message(&data)
    }

    async fn block(
        &self,
        path: &str,
        body: serde_json::Value,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let block: BlockWithRwSet = self.message(path, body).await?;
        Ok(block_info(block, with_rwset))
    }
}

fn request_error(path: &str, e: reqwest::Error) -> ArchiveError {
    if e.is_timeout() {
        ArchiveError::Timeout(path.to_string())
    } else {
        ArchiveError::Transport(format!("{}: {}", path, e))
    }
}

#[async_trait]
impl ArchiveBackend for HttpArchiveBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn register(&self, _genesis: &BlockWithRwSet) -> Result<(), ArchiveError> {
        Err(ArchiveError::NotSupported("register"))
    }

    async fn archive_block(&self, _block: &BlockWithRwSet) -> Result<(), ArchiveError> {
        Err(ArchiveError::NotSupported("archive_block"))
    }

    async fn archive_blocks(
        &self,
        _blocks: &mut dyn crate::ports::BlockIterator,
        _progress: &mut crate::ports::ProgressFn<'_>,
    ) -> Result<(), ArchiveError> {
        Err(ArchiveError::NotSupported("archive_blocks"))
    }

    async fn get_block_by_height(
        &self,
        height: u64,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let body = serde_json::json!({ "height": height, "with_rwset": with_rwset });
        self.block("get_block_by_height", body, with_rwset).await
    }

    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let body = serde_json::json!({ "block_hash": block_hash, "with_rwset": with_rwset });
        self.block("get_block_by_hash", body, with_rwset).await
    }

    async fn get_block_by_tx_id(
        &self,
        tx_id: &str,
        with_rwset: bool,
    ) -> Result<BlockInfo, ArchiveError> {
        let body = serde_json::json!({ "tx_id": tx_id, "with_rwset": with_rwset });
        self.block("get_block_by_txid", body, with_rwset).await
    }

    async fn get_tx_by_tx_id(&self, tx_id: &str) -> Result<TransactionInfo, ArchiveError> {
        self.message("get_transaction_by_txid", serde_json::json!({ "tx_id": tx_id }))
            .await
    }

    async fn get_tx_with_rwset_by_tx_id(
        &self,
        tx_id: &str,
    ) -> Result<TransactionInfoWithRwSet, ArchiveError> {
        self.message("get_tx_with_rwset_by_txid", serde_json::json!({ "tx_id": tx_id }))
            .await
    }

    async fn get_chain_config_by_block_height(
        &self,
        height: u64,
    ) -> Result<ChainConfig, ArchiveError> {
        self.message("get_chainconfig_by_height", serde_json::json!({ "height": height }))
            .await
    }

    async fn get_archived_status(&self) -> Result<StoreArchiveStatus, ArchiveError> {
        let reply: HttpResponse<ArchivedStatusData> = self
            .post("get_archived_status", serde_json::json!({}))
            .await?;
        if reply.code == ArchiveCode::GenesisNotExists as i32 {
            return Ok(StoreArchiveStatus::genesis_not_exists());
        }
        let data = reply.into_data("get_archived_status")?;
        if data.code == ArchiveCode::GenesisNotExists as i32 {
            return Ok(StoreArchiveStatus::genesis_not_exists());
        }
        Ok(StoreArchiveStatus::ok(data.archived_height, data.in_archive))
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}
