//! Height arithmetic for archive and restore.
//!
//! Pure functions: the pipeline gathers node and store status, these decide
//! which heights move.

use super::errors::ArchiveError;
use shared_types::{ArchiveState, NodeArchiveStatus, StoreArchiveStatus};

/// Inclusive height interval to stream to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveWindow {
    pub begin: u64,
    pub end: u64,
}

impl ArchiveWindow {
    pub fn is_empty(&self) -> bool {
        self.begin > self.end
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end - self.begin + 1
        }
    }
}

/// Heights the node is willing to give up for `target`.
pub fn node_window(status: &NodeArchiveStatus, target: u64) -> Result<ArchiveWindow, ArchiveError> {
    if status.state != ArchiveState::Normal {
        return Err(ArchiveError::Busy(format!("node is {}", status.state)));
    }
    Ok(ArchiveWindow {
        begin: status.pivot.saturating_add(1),
        end: target.min(status.max_allow_height),
    })
}

/// Clamp the node window to what the store is missing.
///
/// The store must be contiguous: a node that already archived past the store's
/// cursor would leave a hole, so that is refused before anything is fetched.
pub fn reconcile(
    window: ArchiveWindow,
    store: &StoreArchiveStatus,
) -> Result<ArchiveWindow, ArchiveError> {
    if store.in_archive {
        return Err(ArchiveError::Busy("store is being archived".to_string()));
    }
    let next = store.archived_height.saturating_add(1);
    if window.begin > next {
        return Err(ArchiveError::HeightGap {
            node_begin: window.begin,
            store_height: store.archived_height,
        });
    }
    let window = ArchiveWindow {
        begin: next,
        end: window.end,
    };
    if window.is_empty() {
        return Err(ArchiveError::NothingToArchive {
            begin: window.begin,
            end: window.end,
        });
    }
    Ok(window)
}

/// Heights to restore for `target`, highest first, skipping restored ranges.
pub fn restore_heights(status: &NodeArchiveStatus, target: u64) -> Result<Vec<u64>, ArchiveError> {
    if status.state != ArchiveState::Normal {
        return Err(ArchiveError::Busy(format!("node is {}", status.state)));
    }
    if target > status.pivot {
        return Err(ArchiveError::NothingToRestore {
            target,
            pivot: status.pivot,
        });
    }
    let mut heights = Vec::new();
    let mut height = status.pivot;
    loop {
        if !status.is_restored(height) {
            heights.push(height);
        }
        if height == target || height == 0 {
            break;
        }
        height -= 1;
    }
    Ok(heights)
}
