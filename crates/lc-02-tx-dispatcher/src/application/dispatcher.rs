//! # Transaction Result Dispatcher
//!
//! Owns the waiter registry and the pump task feeding it.

use crate::config::DispatcherConfig;
use crate::domain::{DispatcherError, Waiter, WaiterRegistry};
use crate::ports::BlockSource;
use futures::StreamExt;
use shared_types::proto::BlockInfo;
use shared_types::TxResultEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct TxResultDispatcher {
    config: DispatcherConfig,
    source: Arc<dyn BlockSource>,
    registry: Arc<WaiterRegistry>,
    cursor: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl TxResultDispatcher {
    pub fn new(source: Arc<dyn BlockSource>, config: DispatcherConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            source,
            registry: Arc::new(WaiterRegistry::new()),
            cursor: Arc::new(AtomicU64::new(0)),
            stop_tx,
            task: parking_lot::Mutex::new(None),
        }
    }

    /// Read the current height and start the pump from there.
    pub async fn start(&self) -> Result<(), DispatcherError> {
        if self.task.lock().is_some() {
            return Err(DispatcherError::AlreadyRunning);
        }
        let height = self.source.current_height().await?;
        self.cursor.store(height, Ordering::SeqCst);
        self.stop_tx.send_replace(false);

        let pump = Pump {
            source: self.source.clone(),
            registry: self.registry.clone(),
            cursor: self.cursor.clone(),
            config: self.config.clone(),
            stop: self.stop_tx.subscribe(),
        };
        let handle = tokio::spawn(pump.run());

        let mut task = self.task.lock();
        if task.is_some() {
            handle.abort();
            return Err(DispatcherError::AlreadyRunning);
        }
        *task = Some(handle);
        info!("[lc-02] Dispatcher started at height {}", height);
        Ok(())
    }

    /// Signal the pump and wait for it to finish.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("[lc-02] Pump task ended abnormally: {}", e);
            }
            info!("[lc-02] Dispatcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn register(&self, tx_id: &str) -> Arc<Waiter> {
        self.registry.register(tx_id)
    }

    pub fn unregister(&self, tx_id: &str) {
        self.registry.unregister(tx_id)
    }

    /// Last block height seen by the pump.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &WaiterRegistry {
        &self.registry
    }
}

impl Drop for TxResultDispatcher {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

struct Pump {
    source: Arc<dyn BlockSource>,
    registry: Arc<WaiterRegistry>,
    cursor: Arc<AtomicU64>,
    config: DispatcherConfig,
    stop: watch::Receiver<bool>,
}

impl Pump {
    async fn run(mut self) {
        while !self.stopped() {
            let start = self.cursor.load(Ordering::SeqCst);
            let subscribed = tokio::select! {
                _ = self.stop.changed() => break,
                result = self.source.subscribe_blocks(start) => result,
            };

            match subscribed {
                Ok(mut blocks) => loop {
                    let item = tokio::select! {
                        _ = self.stop.changed() => return,
                        item = blocks.next() => item,
                    };
                    match item {
                        Some(Ok(block)) => self.dispatch(&block),
                        Some(Err(e)) => {
                            warn!("[lc-02] Block stream failed at {}: {}", self.cursor(), e);
                            break;
                        }
                        None => {
                            warn!("[lc-02] Block stream ended at {}", self.cursor());
                            break;
                        }
                    }
                },
                Err(e) => warn!("[lc-02] Subscribe from {} failed: {}", start, e),
            }

            tokio::select! {
                _ = self.stop.changed() => break,
                _ = tokio::time::sleep(self.config.resubscribe_backoff()) => {}
            }
            debug!("[lc-02] Resubscribing from {}", self.cursor());
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    fn dispatch(&self, block: &BlockInfo) {
        let height = block.height();
        if let Some(inner) = &block.block {
            for tx in &inner.txs {
                self.registry.publish(TxResultEvent {
                    tx_id: tx.tx_id().to_string(),
                    result: tx.result.clone().unwrap_or_default(),
                    timestamp: tx.timestamp(),
                    block_height: height,
                });
            }
        }
        self.cursor.store(height, Ordering::SeqCst);
    }
}
