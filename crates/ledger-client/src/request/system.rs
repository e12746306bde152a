//! # System Contracts
//!
//! Chain reads, subscriptions and archive management are ordinary requests
//! addressed to built-in contracts. Numeric parameters travel as decimal
//! strings; flags as `true` / `false`.

pub const CHAIN_QUERY: &str = "CHAIN_QUERY";
pub const CHAIN_CONFIG: &str = "CHAIN_CONFIG";
pub const SUBSCRIBE_MANAGE: &str = "SUBSCRIBE_MANAGE";
pub const ARCHIVE_MANAGE: &str = "ARCHIVE_MANAGE";

/// `CHAIN_QUERY` methods.
pub mod chain_query {
    pub const GET_LAST_BLOCK: &str = "GET_LAST_BLOCK";
    pub const GET_BLOCK_BY_HEIGHT: &str = "GET_BLOCK_BY_HEIGHT";
    pub const GET_BLOCK_BY_HASH: &str = "GET_BLOCK_BY_HASH";
    pub const GET_BLOCK_BY_TX_ID: &str = "GET_BLOCK_BY_TX_ID";
    pub const GET_TX_BY_TX_ID: &str = "GET_TX_BY_TX_ID";
    pub const GET_TX_WITH_RWSET_BY_TX_ID: &str = "GET_TX_WITH_RWSET_BY_TX_ID";
}

/// `CHAIN_CONFIG` methods.
pub mod chain_config {
    pub const GET_CHAIN_CONFIG_AT: &str = "GET_CHAIN_CONFIG_AT";
}

/// `SUBSCRIBE_MANAGE` methods.
pub mod subscribe {
    pub const SUBSCRIBE_BLOCK: &str = "SUBSCRIBE_BLOCK";
}

/// `ARCHIVE_MANAGE` methods.
pub mod archive {
    pub const GET_ARCHIVE_STATUS: &str = "GET_ARCHIVE_STATUS";
    pub const RESTORE_BLOCK: &str = "RESTORE_BLOCK";
}

/// Parameter keys.
pub mod params {
    pub const BLOCK_HEIGHT: &str = "BLOCK_HEIGHT";
    pub const BLOCK_HASH: &str = "BLOCK_HASH";
    pub const TX_ID: &str = "TX_ID";
    pub const WITH_RWSET: &str = "WITH_RWSET";
    pub const START_BLOCK: &str = "START_BLOCK";
    /// `-1` subscribes without an end.
    pub const END_BLOCK: &str = "END_BLOCK";
    pub const ONLY_HEADER: &str = "ONLY_HEADER";
    /// Encoded `BlockWithRwSet` handed back to the node.
    pub const FULL_BLOCK: &str = "FULL_BLOCK";
}

pub fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parse a decimal height parameter.
pub fn parse_height(value: &[u8]) -> Option<u64> {
    std::str::from_utf8(value).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_round_trip() {
        assert_eq!(parse_height(42u64.to_string().as_bytes()), Some(42));
        assert_eq!(parse_height(b"-1"), None);
        assert_eq!(parse_height(b"x"), None);
    }
}
