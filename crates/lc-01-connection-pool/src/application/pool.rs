//! # Connection Pool
//!
//! Slot vector shuffled once, walked in order on every acquisition. The pool
//! mutex covers selection and dialing only; calls run on a [`Lease`] after
//! the lock is released.

use crate::config::PoolConfig;
use crate::domain::{classify, ConnState, FailoverAction, PoolError, SlotId};
use crate::ports::{NodeChannel, NodeConnector, SubscriptionStream};
use rand::seq::SliceRandom;
use rand::Rng;
use shared_types::proto::{TxRequest, TxResponse};
use shared_types::{NodeDescriptor, RpcStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Slot {
    id: SlotId,
    node: NodeDescriptor,
    channel: Option<Arc<dyn NodeChannel>>,
}

impl Slot {
    fn state(&self) -> ConnState {
        self.channel
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ConnState::Absent)
    }
}

/// A slot handed out for one call.
#[derive(Clone)]
pub struct Lease {
    pub slot: SlotId,
    pub channel: Arc<dyn NodeChannel>,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("slot", &self.slot).finish()
    }
}

/// Connection pool over a fixed node set.
pub struct ConnectionPool {
    config: PoolConfig,
    connector: Arc<dyn NodeConnector>,
    slots: Mutex<Vec<Slot>>,
    closed: AtomicBool,
}

impl ConnectionPool {
    /// Build `connCnt` slots per node and shuffle them once.
    pub fn new(
        nodes: Vec<NodeDescriptor>,
        config: PoolConfig,
        connector: Arc<dyn NodeConnector>,
    ) -> Result<Self, PoolError> {
        Self::with_rng(nodes, config, connector, &mut rand::thread_rng())
    }

    /// Same as [`ConnectionPool::new`], shuffling with `rng`. A seeded rng
    /// gives a reproducible slot order.
    pub fn with_rng<R: Rng + ?Sized>(
        nodes: Vec<NodeDescriptor>,
        config: PoolConfig,
        connector: Arc<dyn NodeConnector>,
        rng: &mut R,
    ) -> Result<Self, PoolError> {
        if nodes.is_empty() {
            return Err(PoolError::NoNodes);
        }

        let mut slots = Vec::new();
        for node in nodes {
            if node.conn_count == 0 {
                return Err(PoolError::InvalidNode {
                    address: node.address.clone(),
                    reason: "connection count must be positive".into(),
                });
            }
            for conn in 0..node.conn_count {
                slots.push(Slot {
                    id: SlotId::new(node.index, conn),
                    node: node.clone(),
                    channel: None,
                });
            }
        }
        slots.shuffle(rng);

        debug!("[lc-01] Pool created with {} slots", slots.len());
        Ok(Self {
            config,
            connector,
            slots: Mutex::new(slots),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Slot ids in selection order.
    pub async fn slot_order(&self) -> Vec<SlotId> {
        self.slots.lock().await.iter().map(|s| s.id).collect()
    }

    /// Connectivity of every slot, in selection order.
    pub async fn slot_states(&self) -> Vec<(SlotId, ConnState)> {
        self.slots
            .lock()
            .await
            .iter()
            .map(|s| (s.id, s.state()))
            .collect()
    }

    /// First usable slot not in `blacklist`, retrying with a fixed wait.
    pub async fn acquire(&self, blacklist: &HashSet<SlotId>) -> Result<Lease, PoolError> {
        let attempts = self.config.retry_limit.max(1);
        for attempt in 0..attempts {
            if self.closed.load(Ordering::SeqCst) {
                return Err(PoolError::Closed);
            }
            if let Some(lease) = self.try_select(blacklist).await {
                return Ok(lease);
            }
            if attempt + 1 < attempts {
                debug!(
                    "[lc-01] No usable slot (attempt {}/{}), waiting",
                    attempt + 1,
                    attempts
                );
                tokio::time::sleep(self.config.retry_interval()).await;
            }
        }
        Err(PoolError::NoServiceableConnection { attempts })
    }

    async fn try_select(&self, blacklist: &HashSet<SlotId>) -> Option<Lease> {
        let mut slots = self.slots.lock().await;
        for slot in slots.iter_mut() {
            if blacklist.contains(&slot.id) {
                continue;
            }
            let state = slot.state();
            if state.needs_dial() {
                match self.connector.dial(&slot.node).await {
                    Ok(channel) => {
                        slot.channel = Some(channel.clone());
                        return Some(Lease {
                            slot: slot.id,
                            channel,
                        });
                    }
                    Err(e) => {
                        warn!("[lc-01] Dial failed for slot {}: {}", slot.id, e);
                        continue;
                    }
                }
            }
            if state.is_usable() {
                if let Some(channel) = &slot.channel {
                    return Some(Lease {
                        slot: slot.id,
                        channel: channel.clone(),
                    });
                }
            }
        }
        None
    }

    /// Replace the channel behind `failed` with a fresh dial. If another
    /// caller already swapped the slot's channel, that one is reused.
    async fn repair(&self, failed: &Lease) -> Result<Lease, PoolError> {
        let id = failed.slot;
        let mut slots = self.slots.lock().await;
        let slot = slots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(PoolError::NoServiceableConnection { attempts: 0 })?;

        if let Some(current) = &slot.channel {
            if !same_channel(current, &failed.channel) && current.state().is_usable() {
                debug!("[lc-01] Slot {} already repaired, reusing channel", id);
                return Ok(Lease {
                    slot: id,
                    channel: current.clone(),
                });
            }
        }
        if let Some(old) = slot.channel.take() {
            old.close();
        }
        failed.channel.close();
        let channel = self.connector.dial(&slot.node).await?;
        slot.channel = Some(channel.clone());
        Ok(Lease { slot: id, channel })
    }

    /// Unary request with failover.
    pub async fn send_request(
        &self,
        request: &TxRequest,
        timeout: Duration,
    ) -> Result<TxResponse, PoolError> {
        self.with_failover(|lease| {
            let request = request.clone();
            async move { lease.channel.send_request(request, timeout).await }
        })
        .await
    }

    /// Open a subscription; only establishment is retried.
    pub async fn subscribe(&self, request: &TxRequest) -> Result<SubscriptionStream, PoolError> {
        self.with_failover(|lease| {
            let request = request.clone();
            async move { lease.channel.subscribe(request).await }
        })
        .await
    }

    async fn with_failover<T, F, Fut>(&self, mut call: F) -> Result<T, PoolError>
    where
        F: FnMut(Lease) -> Fut,
        Fut: std::future::Future<Output = Result<T, RpcStatus>>,
    {
        let mut blacklist = HashSet::new();
        let mut repairs = 0usize;
        let mut lease = self.acquire(&blacklist).await?;

        loop {
            let slot = lease.slot;
            let failed = lease.clone();
            let status = match call(lease).await {
                Ok(value) => return Ok(value),
                Err(status) => status,
            };

            lease = match classify(&status) {
                FailoverAction::Timeout => return Err(PoolError::Timeout { slot }),
                FailoverAction::Blacklist => {
                    warn!("[lc-01] Slot {} unavailable, blacklisting: {}", slot, status.message);
                    blacklist.insert(slot);
                    self.acquire(&blacklist).await?
                }
                FailoverAction::Repair => {
                    repairs += 1;
                    if repairs > self.config.retry_limit {
                        return Err(PoolError::RepairExhausted { slot, repairs: repairs - 1 });
                    }
                    warn!("[lc-01] Slot {} stream corrupted, re-dialing", slot);
                    self.repair(&failed).await?
                }
                FailoverAction::Fail => return Err(PoolError::Rpc { slot, status }),
            };
        }
    }

    /// Shut every slot down. Later acquisitions fail with `Closed`.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut slots = self.slots.lock().await;
        for slot in slots.iter_mut() {
            if let Some(channel) = slot.channel.take() {
                channel.close();
            }
        }
        debug!("[lc-01] Pool closed");
    }
}

fn same_channel(a: &Arc<dyn NodeChannel>, b: &Arc<dyn NodeChannel>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
