//! # Outbound Ports

use async_trait::async_trait;
use shared_types::proto::{TxRequest, TxResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fetches one node's answer to a query.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    fn node_count(&self) -> usize;

    /// `None` when the node produced no usable response.
    async fn fetch(&self, node: usize, request: &TxRequest, timeout: Duration)
        -> Option<TxResponse>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Fixed per-node answers with optional per-node delay.
#[derive(Clone, Default)]
pub struct MockFetcher {
    answers: Vec<(Option<TxResponse>, Duration)>,
    completed: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, answer: Option<TxResponse>) -> Self {
        self.answers.push((answer, Duration::ZERO));
        self
    }

    pub fn slow_node(mut self, answer: Option<TxResponse>, delay: Duration) -> Self {
        self.answers.push((answer, delay));
        self
    }

    /// Fetches that ran to completion (not cancelled).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryFetcher for MockFetcher {
    fn node_count(&self) -> usize {
        self.answers.len()
    }

    async fn fetch(
        &self,
        node: usize,
        _request: &TxRequest,
        _timeout: Duration,
    ) -> Option<TxResponse> {
        let (answer, delay) = self.answers.get(node)?.clone();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        answer
    }
}
