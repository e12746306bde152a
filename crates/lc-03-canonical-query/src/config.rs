//! # Quorum Query Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Overall deadline for one canonical query, in seconds.
    pub timeout_secs: u64,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl QuorumConfig {
    pub fn for_testing() -> Self {
        Self { timeout_secs: 2 }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
