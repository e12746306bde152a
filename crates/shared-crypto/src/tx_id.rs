//! # Transaction Ids
//!
//! Client-generated ids are always 64 lowercase hex characters.
//!
//! - **Random**: 32 random bytes.
//! - **Timestamp-prefixed**: 8 bytes of big-endian unix nanoseconds, the
//!   marker byte `0xca`, then 23 random bytes. Ids sort roughly by creation
//!   time, which keeps node-side tx indexes append-friendly.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Marker byte between the timestamp and the random tail.
const TIMESTAMP_MARKER: u8 = 0xca;

/// Which id scheme to use when the payload carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TxIdScheme {
    Random,
    #[default]
    TimestampPrefixed,
}

/// 64 hex chars from 32 random bytes.
pub fn random_tx_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 64 hex chars: big-endian nanos, `ca`, random tail.
pub fn timestamp_tx_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    timestamp_tx_id_at(nanos)
}

fn timestamp_tx_id_at(nanos: u64) -> String {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&nanos.to_be_bytes());
    bytes[8] = TIMESTAMP_MARKER;
    rand::thread_rng().fill_bytes(&mut bytes[9..]);
    hex::encode(bytes)
}

pub fn generate_tx_id(scheme: TxIdScheme) -> String {
    match scheme {
        TxIdScheme::Random => random_tx_id(),
        TxIdScheme::TimestampPrefixed => timestamp_tx_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TX_ID_HEX_LEN;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn test_random_id_shape() {
        let id = random_tx_id();
        assert_eq!(id.len(), TX_ID_HEX_LEN);
        assert!(is_lower_hex(&id));
        assert_ne!(id, random_tx_id());
    }

    #[test]
    fn test_timestamp_id_layout() {
        let id = timestamp_tx_id_at(0x0102_0304_0506_0708);
        assert_eq!(id.len(), TX_ID_HEX_LEN);
        assert!(id.starts_with("0102030405060708ca"));
        assert!(is_lower_hex(&id));
    }

    #[test]
    fn test_timestamp_ids_sort_by_time() {
        let earlier = timestamp_tx_id_at(1_000);
        let later = timestamp_tx_id_at(2_000);
        assert!(earlier < later);
    }

    #[test]
    fn test_generate_dispatches_on_scheme() {
        let id = generate_tx_id(TxIdScheme::TimestampPrefixed);
        assert_eq!(&id[16..18], "ca");
        assert_eq!(generate_tx_id(TxIdScheme::Random).len(), TX_ID_HEX_LEN);
    }
}
