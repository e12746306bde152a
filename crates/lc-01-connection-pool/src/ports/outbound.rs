//! # Outbound Ports
//!
//! Transport seams: dialing a node and calling over an established channel.

use crate::domain::{ConnState, PoolError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use shared_types::proto::{SubscribeResult, TxRequest, TxResponse};
use shared_types::{NodeDescriptor, RpcStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frames of a server-streaming subscription.
pub type SubscriptionStream = BoxStream<'static, Result<SubscribeResult, RpcStatus>>;

/// One multiplexed channel to a node.
#[async_trait]
pub trait NodeChannel: Send + Sync {
    /// Unary request with a per-call deadline.
    async fn send_request(
        &self,
        request: TxRequest,
        timeout: Duration,
    ) -> Result<TxResponse, RpcStatus>;

    /// Open a server-streaming subscription.
    async fn subscribe(&self, request: TxRequest) -> Result<SubscriptionStream, RpcStatus>;

    /// Current connectivity state.
    fn state(&self) -> ConnState;

    /// Tear the channel down. Idempotent.
    fn close(&self);
}

/// Creates channels for node descriptors.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn dial(&self, node: &NodeDescriptor) -> Result<Arc<dyn NodeChannel>, PoolError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted behaviour of one mock node.
///
/// Queued outcomes are consumed first, then `fallback` repeats forever.
#[derive(Debug, Clone)]
pub struct MockNodeScript {
    pub queued: VecDeque<Result<TxResponse, RpcStatus>>,
    pub fallback: Result<TxResponse, RpcStatus>,
    /// Frames served to every subscription.
    pub frames: Vec<Result<SubscribeResult, RpcStatus>>,
    /// Artificial latency per unary call.
    pub latency: Duration,
    pub reconnect_backoff: Duration,
}

impl MockNodeScript {
    /// Node that always answers with `response`.
    pub fn responding(response: TxResponse) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: Ok(response),
            frames: Vec::new(),
            latency: Duration::ZERO,
            reconnect_backoff: Duration::ZERO,
        }
    }

    /// Node that always fails with `status`.
    pub fn failing(status: RpcStatus) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: Err(status),
            frames: Vec::new(),
            latency: Duration::ZERO,
            reconnect_backoff: Duration::ZERO,
        }
    }

    /// Queue an outcome ahead of the fallback.
    pub fn then(mut self, outcome: Result<TxResponse, RpcStatus>) -> Self {
        self.queued.push_back(outcome);
        self
    }

    pub fn with_frames(mut self, frames: Vec<Result<SubscribeResult, RpcStatus>>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// How long a channel stays in `TransientFailure` after `Unavailable`.
    /// Zero lets the next call use it again.
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    fn next_outcome(&mut self) -> Result<TxResponse, RpcStatus> {
        self.queued
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
struct MockNodeState {
    script: Mutex<Option<MockNodeScript>>,
    calls: AtomicUsize,
    dials: AtomicUsize,
}

/// Connector serving scripted nodes keyed by address.
#[derive(Default, Clone)]
pub struct MockConnector {
    nodes: Arc<Mutex<HashMap<String, Arc<MockNodeState>>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the script for `address`.
    pub fn with_node(self, address: impl Into<String>, script: MockNodeScript) -> Self {
        self.set_script(address, script);
        self
    }

    pub fn set_script(&self, address: impl Into<String>, script: MockNodeScript) {
        let state = self.node(&address.into());
        *state.script.lock() = Some(script);
    }

    /// Unary calls received by `address` across all its channels.
    pub fn calls(&self, address: &str) -> usize {
        self.node(address).calls.load(Ordering::SeqCst)
    }

    /// Dials made to `address`.
    pub fn dials(&self, address: &str) -> usize {
        self.node(address).dials.load(Ordering::SeqCst)
    }

    fn node(&self, address: &str) -> Arc<MockNodeState> {
        self.nodes
            .lock()
            .entry(address.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl NodeConnector for MockConnector {
    async fn dial(&self, node: &NodeDescriptor) -> Result<Arc<dyn NodeChannel>, PoolError> {
        let state = self.node(&node.address);
        if state.script.lock().is_none() {
            return Err(PoolError::InvalidNode {
                address: node.address.clone(),
                reason: "no script registered".into(),
            });
        }
        state.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockChannel {
            node: state,
            state: Mutex::new((ConnState::Idle, None)),
        }))
    }
}

struct MockChannel {
    node: Arc<MockNodeState>,
    state: Mutex<(ConnState, Option<Instant>)>,
}

#[async_trait]
impl NodeChannel for MockChannel {
    async fn send_request(
        &self,
        _request: TxRequest,
        timeout: Duration,
    ) -> Result<TxResponse, RpcStatus> {
        if self.state() == ConnState::Shutdown {
            return Err(RpcStatus::unavailable("channel closed"));
        }
        self.node.calls.fetch_add(1, Ordering::SeqCst);
        let (outcome, latency, backoff) = {
            let mut script = self.node.script.lock();
            match script.as_mut() {
                Some(s) => (s.next_outcome(), s.latency, s.reconnect_backoff),
                None => (
                    Err(RpcStatus::unavailable("node removed")),
                    Duration::ZERO,
                    Duration::ZERO,
                ),
            }
        };
        if !latency.is_zero() {
            if latency > timeout {
                tokio::time::sleep(timeout).await;
                return Err(RpcStatus::deadline_exceeded("mock deadline"));
            }
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        if state.0 != ConnState::Shutdown {
            match &outcome {
                Ok(_) => *state = (ConnState::Ready, None),
                Err(status) if status.code == shared_types::RpcCode::Unavailable => {
                    *state = (ConnState::TransientFailure, Some(Instant::now() + backoff))
                }
                Err(_) => {}
            }
        }
        drop(state);
        outcome
    }

    async fn subscribe(&self, _request: TxRequest) -> Result<SubscriptionStream, RpcStatus> {
        let frames = self
            .node
            .script
            .lock()
            .as_ref()
            .map(|s| s.frames.clone())
            .unwrap_or_default();
        Ok(stream::iter(frames).boxed())
    }

    fn state(&self) -> ConnState {
        match *self.state.lock() {
            (ConnState::TransientFailure, Some(until)) if Instant::now() >= until => {
                ConnState::Idle
            }
            (conn, _) => conn,
        }
    }

    fn close(&self) {
        *self.state.lock() = (ConnState::Shutdown, None);
    }
}
