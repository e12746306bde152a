//! # Core Domain Entities
//!
//! Transport-neutral entities shared by the subsystems.
//!
//! ## Clusters
//!
//! - **Nodes**: `NodeDescriptor`
//! - **Results**: `TxResultEvent`
//! - **Archive**: `NodeArchiveStatus`, `HeightRange`, `StoreArchiveStatus`,
//!   `ArchiveProgress`

use crate::proto::{self, ArchiveProcess, TxResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// NODES
// =============================================================================

/// Immutable description of one consensus node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Position in the configured node list.
    pub index: usize,
    /// `host:port` of the node's RPC endpoint.
    pub address: String,
    /// Number of concurrent connections to keep to this node.
    pub conn_count: usize,
    /// Whether the transport is TLS protected.
    pub enable_tls: bool,
    /// Trust roots given as file paths.
    pub trust_root_paths: Vec<PathBuf>,
    /// Trust roots given inline as PEM. Takes precedence over paths.
    pub trust_roots: Vec<String>,
    /// Expected server name in the node's certificate.
    pub tls_host_name: String,
}

impl NodeDescriptor {
    /// Plain-text descriptor with one connection; mostly for tests.
    pub fn plain(index: usize, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
            conn_count: 1,
            enable_tls: false,
            trust_root_paths: Vec::new(),
            trust_roots: Vec::new(),
            tls_host_name: String::new(),
        }
    }

    /// Builder-style connection count.
    pub fn with_conn_count(mut self, conn_count: usize) -> Self {
        self.conn_count = conn_count;
        self
    }

    /// Session-unique key: `index ∥ address ∥ serverName`.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.index, self.address, self.tls_host_name)
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Result of one transaction, as observed in a committed block.
#[derive(Debug, Clone, PartialEq)]
pub struct TxResultEvent {
    pub tx_id: String,
    pub result: TxResult,
    /// Timestamp from the transaction payload.
    pub timestamp: i64,
    pub block_height: u64,
}

// =============================================================================
// ARCHIVE
// =============================================================================

/// Archive process a node is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveState {
    Normal,
    Archiving,
    Restoring,
}

impl From<ArchiveProcess> for ArchiveState {
    fn from(value: ArchiveProcess) -> Self {
        match value {
            ArchiveProcess::Normal => ArchiveState::Normal,
            ArchiveProcess::Archiving => ArchiveState::Archiving,
            ArchiveProcess::Restoring => ArchiveState::Restoring,
        }
    }
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveState::Normal => write!(f, "normal"),
            ArchiveState::Archiving => write!(f, "archiving"),
            ArchiveState::Restoring => write!(f, "restoring"),
        }
    }
}

/// Height interval already restored on the node, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightRange {
    pub start: u64,
    pub end: u64,
}

impl HeightRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, height: u64) -> bool {
        self.start <= height && height <= self.end
    }
}

/// Archive status reported by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeArchiveStatus {
    pub state: ArchiveState,
    /// Highest height already moved out of live storage.
    pub pivot: u64,
    /// Highest height the node allows to be archived right now.
    pub max_allow_height: u64,
    pub restored_ranges: Vec<HeightRange>,
}

impl NodeArchiveStatus {
    /// Idle node with the given pivot and limit.
    pub fn normal(pivot: u64, max_allow_height: u64) -> Self {
        Self {
            state: ArchiveState::Normal,
            pivot,
            max_allow_height,
            restored_ranges: Vec::new(),
        }
    }

    /// True when `height` lies in an already restored range.
    pub fn is_restored(&self, height: u64) -> bool {
        self.restored_ranges.iter().any(|r| r.contains(height))
    }
}

impl From<proto::ArchiveStatus> for NodeArchiveStatus {
    fn from(value: proto::ArchiveStatus) -> Self {
        Self {
            state: value.process().into(),
            pivot: value.archive_pivot,
            max_allow_height: value.max_allow_archive_height,
            restored_ranges: value
                .file_ranges
                .iter()
                .map(|r| HeightRange::new(r.start, r.end))
                .collect(),
        }
    }
}

/// Outcome code of a store status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatusCode {
    Ok,
    /// The store has never seen this chain's genesis block.
    GenesisNotExists,
}

/// Archive status reported by the archive store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreArchiveStatus {
    pub archived_height: u64,
    pub in_archive: bool,
    pub code: StoreStatusCode,
}

impl StoreArchiveStatus {
    pub fn ok(archived_height: u64, in_archive: bool) -> Self {
        Self {
            archived_height,
            in_archive,
            code: StoreStatusCode::Ok,
        }
    }

    pub fn genesis_not_exists() -> Self {
        Self {
            archived_height: 0,
            in_archive: false,
            code: StoreStatusCode::GenesisNotExists,
        }
    }
}

/// Progress token delivered once per attempted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveProgress {
    pub current_height: u64,
    pub total: u64,
    pub error: Option<String>,
}

impl ArchiveProgress {
    pub fn ok(current_height: u64, total: u64) -> Self {
        Self {
            current_height,
            total,
            error: None,
        }
    }

    pub fn failed(current_height: u64, total: u64, error: impl Into<String>) -> Self {
        Self {
            current_height,
            total,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
