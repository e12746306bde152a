//! # Outbound Ports
//!
//! Where blocks come from. The session wires this to a pool subscription.

use crate::domain::DispatcherError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use shared_types::proto::BlockInfo;
use std::collections::VecDeque;
use std::sync::Arc;

/// Committed blocks, in height order. Read/write sets are not requested.
pub type BlockStream = BoxStream<'static, Result<BlockInfo, DispatcherError>>;

#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Latest committed height.
    async fn current_height(&self) -> Result<u64, DispatcherError>;

    /// Blocks from `start` onwards, without an end.
    async fn subscribe_blocks(&self, start: u64) -> Result<BlockStream, DispatcherError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Block source replaying scripted subscription sessions.
///
/// Each `subscribe_blocks` call consumes one session. When no sessions are
/// left the returned stream stays open without yielding.
#[derive(Clone, Default)]
pub struct MockBlockSource {
    height: Arc<Mutex<u64>>,
    sessions: Arc<Mutex<VecDeque<Vec<Result<BlockInfo, DispatcherError>>>>>,
    starts: Arc<Mutex<Vec<u64>>>,
}

impl MockBlockSource {
    pub fn new(current_height: u64) -> Self {
        let source = Self::default();
        *source.height.lock() = current_height;
        source
    }

    /// Queue the items one subscription will yield before ending.
    pub fn push_session(&self, items: Vec<Result<BlockInfo, DispatcherError>>) {
        self.sessions.lock().push_back(items);
    }

    /// Start heights of every subscription made so far.
    pub fn starts(&self) -> Vec<u64> {
        self.starts.lock().clone()
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn current_height(&self) -> Result<u64, DispatcherError> {
        Ok(*self.height.lock())
    }

    async fn subscribe_blocks(&self, start: u64) -> Result<BlockStream, DispatcherError> {
        self.starts.lock().push(start);
        match self.sessions.lock().pop_front() {
            Some(items) => Ok(stream::iter(items).boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }
}
