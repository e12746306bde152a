//! # Pool Entities

use std::fmt;

/// Stable identity of a connection slot.
///
/// Assigned before the shuffle and never reused, so it stays valid as a
/// blacklist key for the whole life of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    /// Index of the node in the configured list.
    pub node: usize,
    /// Connection number within that node, `0..connCnt`.
    pub conn: usize,
}

impl SlotId {
    pub fn new(node: usize, conn: usize) -> Self {
        Self { node, conn }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}#{}", self.node, self.conn)
    }
}

/// Connectivity state of a slot's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnState {
    /// Never dialed.
    Absent,
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    /// Closed; must be re-dialed before use.
    Shutdown,
}

impl ConnState {
    /// States in which the slot can be handed out as is.
    pub fn is_usable(self) -> bool {
        matches!(self, ConnState::Idle | ConnState::Ready | ConnState::Connecting)
    }

    /// States that require a fresh dial first.
    pub fn needs_dial(self) -> bool {
        matches!(self, ConnState::Absent | ConnState::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_display() {
        assert_eq!(SlotId::new(2, 1).to_string(), "node2#1");
    }

    #[test]
    fn test_state_partition() {
        for state in [
            ConnState::Absent,
            ConnState::Idle,
            ConnState::Connecting,
            ConnState::Ready,
            ConnState::TransientFailure,
            ConnState::Shutdown,
        ] {
            // never both usable and in need of a dial
            assert!(!(state.is_usable() && state.needs_dial()));
        }
        assert!(!ConnState::TransientFailure.is_usable());
        assert!(!ConnState::TransientFailure.needs_dial());
    }
}
