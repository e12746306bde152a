//! # Dispatcher Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Wait before resubscribing after the block stream fails, in ms.
    pub resubscribe_backoff_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            resubscribe_backoff_ms: 1000,
        }
    }
}

impl DispatcherConfig {
    pub fn for_testing() -> Self {
        Self {
            resubscribe_backoff_ms: 10,
        }
    }

    pub fn resubscribe_backoff(&self) -> Duration {
        Duration::from_millis(self.resubscribe_backoff_ms)
    }
}
