//! # Shared Crypto - Client-side Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, SM3 | Response fingerprints, archival HMAC |
//! | `ecdsa` | secp256k1 | Request signing |
//! | `tx_id` | OS randomness | Client-generated transaction ids |
//! | `signer` | - | Cert, cert-hash, alias, public-key and permissioned-key signers |
//! | `security` | - | Per-session HSM / KMS delegation settings |
//!
//! ## Archival HMAC
//!
//! `SM3(utf8(chainId) ∥ le64(height) ∥ payload ∥ utf8(secret))`, hex-lowercase.
//! This is the one bit-exact contract shared with other archive readers.

#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod security;
pub mod signer;
pub mod tx_id;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey};
pub use errors::CryptoError;
pub use hashing::{archive_hmac, sha256, verify_archive_hmac};
pub use security::{ExternalSigner, KeyHandle, KmsConfig, Pkcs11Config, SecurityContext};
pub use signer::{
    AliasSigner, CertHashSigner, CertSigner, PermissionedKeySigner, PublicKeySigner, Signer,
};
pub use tx_id::{generate_tx_id, random_tx_id, timestamp_tx_id, TxIdScheme};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
