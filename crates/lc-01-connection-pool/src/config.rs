//! # Pool Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One mebibyte; message size limits are configured in MiB.
pub const MIB: usize = 1024 * 1024;

/// Connection pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// How many times `acquire` looks for a usable slot.
    pub retry_limit: usize,

    /// Wait between acquisition attempts, in milliseconds.
    pub retry_interval_ms: u64,

    /// Maximum encoded request size in bytes.
    pub max_send_msg_size: usize,

    /// Maximum decoded response size in bytes.
    pub max_recv_msg_size: usize,

    /// HTTP/2 keepalive ping interval, in seconds.
    pub keepalive_interval_secs: u64,

    /// Keepalive ack timeout, in seconds.
    pub keepalive_timeout_secs: u64,

    /// Connection establishment timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            retry_interval_ms: 500,
            max_send_msg_size: 4 * MIB,
            max_recv_msg_size: 4 * MIB,
            keepalive_interval_secs: 10,
            keepalive_timeout_secs: 1,
            connect_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    /// Create a config for testing (short waits).
    pub fn for_testing() -> Self {
        Self {
            retry_limit: 3,
            retry_interval_ms: 5,
            ..Self::default()
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
