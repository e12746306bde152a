//! # Waiter Registry
//!
//! `tx id → buffer-of-one channel`. Publishing never blocks. A delivery
//! removes the entry, so a later event for the same tx id (a block replayed
//! after resubscribe) finds no waiter and is dropped.

use super::DispatcherError;
use parking_lot::Mutex;
use shared_types::TxResultEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end handed to the caller.
#[derive(Debug)]
pub struct Waiter {
    tx_id: String,
    rx: tokio::sync::Mutex<mpsc::Receiver<TxResultEvent>>,
}

impl Waiter {
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Next event, or `None` once the waiter has been unregistered.
    pub async fn recv(&self) -> Option<TxResultEvent> {
        self.rx.lock().await.recv().await
    }

    pub async fn recv_timeout(&self, timeout: Duration) -> Result<TxResultEvent, DispatcherError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(DispatcherError::Closed {
                tx_id: self.tx_id.clone(),
            }),
            Err(_) => Err(DispatcherError::Timeout {
                tx_id: self.tx_id.clone(),
            }),
        }
    }
}

struct Entry {
    sender: mpsc::Sender<TxResultEvent>,
    waiter: Arc<Waiter>,
}

/// Registry of live waiters.
#[derive(Default)]
pub struct WaiterRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing waiter for `tx_id`, or a fresh one.
    pub fn register(&self, tx_id: &str) -> Arc<Waiter> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(tx_id) {
            return entry.waiter.clone();
        }
        let (sender, rx) = mpsc::channel(1);
        let waiter = Arc::new(Waiter {
            tx_id: tx_id.to_string(),
            rx: tokio::sync::Mutex::new(rx),
        });
        entries.insert(
            tx_id.to_string(),
            Entry {
                sender,
                waiter: waiter.clone(),
            },
        );
        waiter
    }

    /// Remove the waiter and close its channel. No-op once delivered.
    pub fn unregister(&self, tx_id: &str) {
        // dropping the entry drops the only sender
        self.entries.lock().remove(tx_id);
    }

    pub fn is_registered(&self, tx_id: &str) -> bool {
        self.entries.lock().contains_key(tx_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` if someone waits for it. Returns whether it was taken.
    ///
    /// A taken event retires the waiter: its sender is dropped with the
    /// entry, the queued value stays readable.
    pub fn publish(&self, event: TxResultEvent) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(&event.tx_id) else {
            debug!(
                "[lc-02] No waiter for {} at height {}",
                event.tx_id, event.block_height
            );
            return false;
        };
        let tx_id = event.tx_id.clone();
        match entry.sender.try_send(event) {
            Ok(()) => {
                entries.remove(&tx_id);
                true
            }
            Err(_) => false,
        }
    }
}
