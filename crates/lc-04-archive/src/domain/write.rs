//! SQL store write rules.

/// What to do with a block given the row already stored at its height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// Row exists and is archived.
    Skip,
    /// Row exists but was left unarchived; flip the flag only.
    MarkArchived,
    /// No row; insert it and advance the cursor in one transaction.
    Insert,
}

/// `existing` is the archived flag of the stored row, if any.
pub fn decide_write(existing: Option<bool>) -> WriteAction {
    match existing {
        Some(true) => WriteAction::Skip,
        Some(false) => WriteAction::MarkArchived,
        None => WriteAction::Insert,
    }
}

/// 1-based shard holding `height`.
pub fn shard_index(height: u64, shard_size: u64) -> u64 {
    height / shard_size.max(1) + 1
}

pub fn shard_table(height: u64, shard_size: u64) -> String {
    format!("block_info_{}", shard_index(height, shard_size))
}
