//! # Hashing
//!
//! SHA-256 for response fingerprints and cert hashes, SM3 for the archival
//! HMAC.

use sha2::{Digest, Sha256};
use sm3::Sm3;

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Archival integrity tag of one serialized block.
///
/// `SM3(utf8(chain_id) ∥ le64(height) ∥ payload ∥ utf8(secret))`, hex-lowercase.
pub fn archive_hmac(chain_id: &str, height: u64, payload: &[u8], secret: &str) -> String {
    let mut hasher = Sm3::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(payload);
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the tag and compare it with `expected`.
///
/// Comparison is case-insensitive so rows written by tools that emit
/// uppercase hex still verify.
pub fn verify_archive_hmac(
    chain_id: &str,
    height: u64,
    payload: &[u8],
    secret: &str,
    expected: &str,
) -> bool {
    archive_hmac(chain_id, height, payload, secret).eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sm3_known_vector() {
        let digest = Sm3::digest(b"abc");
        assert_eq!(
            hex::encode(digest),
            "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0"
        );
    }

    #[test]
    fn test_archive_hmac_layout() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"chain1");
        buf.extend_from_slice(&7u64.to_le_bytes());
        buf.extend_from_slice(b"payload");
        buf.extend_from_slice(b"secret");
        let expected = hex::encode(Sm3::digest(&buf));

        assert_eq!(archive_hmac("chain1", 7, b"payload", "secret"), expected);
    }

    #[test]
    fn test_archive_hmac_is_lowercase_hex() {
        let tag = archive_hmac("chain1", 1, b"x", "k");
        assert_eq!(tag.len(), 64);
        assert!(tag.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_verify_accepts_uppercase() {
        let tag = archive_hmac("chain1", 3, b"data", "k").to_uppercase();
        assert!(verify_archive_hmac("chain1", 3, b"data", "k", &tag));
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    proptest! {
        #[test]
        fn prop_height_changes_tag(height in 0u64..u64::MAX, payload in proptest::collection::vec(any::<u8>(), 0..64)) {
            let a = archive_hmac("c", height, &payload, "s");
            let b = archive_hmac("c", height + 1, &payload, "s");
            prop_assert_ne!(a, b);
        }

        #[test]
        fn prop_secret_changes_tag(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
            let a = archive_hmac("c", 1, &payload, "s1");
            let b = archive_hmac("c", 1, &payload, "s2");
            prop_assert_ne!(&a, &b);
            prop_assert!(verify_archive_hmac("c", 1, &payload, "s1", &a));
            prop_assert!(!verify_archive_hmac("c", 1, &payload, "s1", &b));
        }
    }
}
