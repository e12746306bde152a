//! # Archive Configuration
//!
//! Two independent backends can be configured: the remote archive service
//! (`archiveCenter`) and a local MySQL store (`archive`). Keys are camelCase
//! to match the client's YAML file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default shard width of the SQL store, in blocks per table.
pub const DEFAULT_SHARD_SIZE: u64 = 100_000;

/// TLS settings for the archive service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveTlsConfig {
    pub server_name: String,
    pub trust_ca_list: Vec<String>,
    pub cert_file: String,
    pub key_file: String,
}

/// Remote archive service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveCenterConfig {
    /// Hex hash of the chain's genesis block; scopes every request.
    pub chain_genesis_hash: String,
    /// Base URL of the read-only HTTP gateway.
    pub http_url: String,
    /// `host:port` of the gRPC endpoint.
    pub rpc_address: String,
    pub tls_enable: bool,
    pub tls: ArchiveTlsConfig,
    /// Per-call deadline in seconds.
    pub request_second_limit: u64,
    /// Use one open-send-close-recv exchange per block instead of the
    /// acknowledged stream.
    pub single_write: bool,
    /// MiB
    pub max_send_msg_size: usize,
    /// MiB
    pub max_recv_msg_size: usize,
}

impl Default for ArchiveCenterConfig {
    fn default() -> Self {
        Self {
            chain_genesis_hash: String::new(),
            http_url: String::new(),
            rpc_address: String::new(),
            tls_enable: false,
            tls: ArchiveTlsConfig::default(),
            request_second_limit: 10,
            single_write: false,
            max_send_msg_size: 200,
            max_recv_msg_size: 200,
        }
    }
}

impl ArchiveCenterConfig {
    pub fn for_testing() -> Self {
        Self {
            chain_genesis_hash: "00".repeat(32),
            rpc_address: "127.0.0.1:13119".to_string(),
            http_url: "http://127.0.0.1:13119".to_string(),
            request_second_limit: 1,
            ..Default::default()
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.request_second_limit.max(1))
    }
}

/// Local SQL archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlArchiveConfig {
    /// Only `mysql` is recognised.
    #[serde(rename = "type")]
    pub kind: String,
    /// `user:password:host:port`, or a full `mysql://` URL.
    pub dest: String,
    /// Appended to every HMAC input.
    pub secret_key: String,
    pub shard_size: u64,
}

impl Default for SqlArchiveConfig {
    fn default() -> Self {
        Self {
            kind: "mysql".to_string(),
            dest: String::new(),
            secret_key: String::new(),
            shard_size: DEFAULT_SHARD_SIZE,
        }
    }
}

impl SqlArchiveConfig {
    pub fn for_testing() -> Self {
        Self {
            dest: "root:root:127.0.0.1:3306".to_string(),
            secret_key: "secret".to_string(),
            shard_size: 10,
            ..Default::default()
        }
    }

    /// Connection URL for `chain_id`'s database.
    ///
    /// The colon form names no database, so one is derived per chain.
    pub fn mysql_url(&self, chain_id: &str) -> Option<String> {
        if self.dest.starts_with("mysql://") {
            return Some(self.dest.clone());
        }
        self.server_url()
            .map(|server| format!("{}/{}", server, database_name(chain_id)))
    }

    /// Server-level URL for creating the chain database. Only the colon form
    /// yields one; a full URL is expected to name an existing database.
    pub fn server_url(&self) -> Option<String> {
        if self.dest.starts_with("mysql://") {
            return None;
        }
        let parts: Vec<&str> = self.dest.splitn(4, ':').collect();
        match parts.as_slice() {
            [user, password, host, port] => {
                Some(format!("mysql://{}:{}@{}:{}", user, password, host, port))
            }
            _ => None,
        }
    }
}

/// Database holding one chain's archived blocks.
pub fn database_name(chain_id: &str) -> String {
    let sanitized: String = chain_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("archived_{}", sanitized)
}
