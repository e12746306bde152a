//! Crypto error types.

use shared_types::ErrorKind;
use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Private key could not be parsed from PEM or raw bytes.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// HSM or KMS delegation is enabled but no external signer was supplied.
    #[error("External signer required by {0} but none configured")]
    ExternalSignerMissing(&'static str),

    /// The external key service refused or failed to sign.
    #[error("External signer failed: {0}")]
    ExternalSignerFailed(String),

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::InvalidPrivateKey(_)
            | CryptoError::InvalidPublicKey
            | CryptoError::ExternalSignerMissing(_)
            | CryptoError::InvalidInput(_) => ErrorKind::ConfigInvalid,
            CryptoError::ExternalSignerFailed(_) => ErrorKind::RemoteRejected,
            CryptoError::InvalidSignature | CryptoError::SignatureVerificationFailed => {
                ErrorKind::Internal
            }
        }
    }
}
