//! # Signers
//!
//! A signer endorses a payload and describes itself as a [`Member`]. The
//! member form depends on how the chain identifies users:
//!
//! | Signer | Member type | `member_info` |
//! |--------|-------------|---------------|
//! | `CertSigner` | `Cert` | full certificate PEM |
//! | `CertHashSigner` | `CertHash` | SHA-256 of the certificate |
//! | `AliasSigner` | `Alias` | registered certificate alias |
//! | `PublicKeySigner` | `PublicKey` | public key PEM, no org |
//! | `PermissionedKeySigner` | `PublicKey` | public key PEM, org scoped |

use crate::{hashing::sha256, CryptoError, KeyHandle, Secp256k1KeyPair};
use shared_types::proto::{EndorsementEntry, Member, MemberType};
use std::sync::Arc;

/// Produces endorsements for outgoing requests.
pub trait Signer: Send + Sync {
    /// Sign the encoded payload.
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Identity attached to the signature.
    fn new_member(&self) -> Member;

    /// Signature plus member in wire form.
    fn endorse(&self, payload: &[u8]) -> Result<EndorsementEntry, CryptoError> {
        Ok(EndorsementEntry {
            signer: Some(self.new_member()),
            signature: self.sign(payload)?,
        })
    }
}

fn member(org_id: &str, member_type: MemberType, member_info: Vec<u8>) -> Member {
    Member {
        org_id: org_id.to_string(),
        member_type: member_type as i32,
        member_info,
    }
}

/// Identifies by full certificate.
#[derive(Debug, Clone)]
pub struct CertSigner {
    org_id: String,
    cert_pem: Vec<u8>,
    key: KeyHandle,
}

impl CertSigner {
    pub fn new(org_id: impl Into<String>, cert_pem: Vec<u8>, key: KeyHandle) -> Self {
        Self {
            org_id: org_id.into(),
            cert_pem,
            key,
        }
    }
}

impl Signer for CertSigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(payload)
    }

    fn new_member(&self) -> Member {
        member(&self.org_id, MemberType::Cert, self.cert_pem.clone())
    }
}

/// Identifies by the SHA-256 of a certificate already on chain.
#[derive(Debug, Clone)]
pub struct CertHashSigner {
    org_id: String,
    cert_hash: [u8; 32],
    key: KeyHandle,
}

impl CertHashSigner {
    pub fn new(org_id: impl Into<String>, cert_pem: &[u8], key: KeyHandle) -> Self {
        Self {
            org_id: org_id.into(),
            cert_hash: sha256(cert_pem),
            key,
        }
    }

    pub fn cert_hash(&self) -> &[u8; 32] {
        &self.cert_hash
    }
}

impl Signer for CertHashSigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(payload)
    }

    fn new_member(&self) -> Member {
        member(&self.org_id, MemberType::CertHash, self.cert_hash.to_vec())
    }
}

/// Identifies by a certificate alias registered on chain.
#[derive(Debug, Clone)]
pub struct AliasSigner {
    org_id: String,
    alias: String,
    key: KeyHandle,
}

impl AliasSigner {
    pub fn new(org_id: impl Into<String>, alias: impl Into<String>, key: KeyHandle) -> Self {
        Self {
            org_id: org_id.into(),
            alias: alias.into(),
            key,
        }
    }
}

impl Signer for AliasSigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(payload)
    }

    fn new_member(&self) -> Member {
        member(&self.org_id, MemberType::Alias, self.alias.as_bytes().to_vec())
    }
}

/// Public-mode identity: a bare public key.
#[derive(Debug, Clone)]
pub struct PublicKeySigner {
    public_key_pem: String,
    key: KeyHandle,
}

impl PublicKeySigner {
    pub fn new(public_key_pem: impl Into<String>, key: KeyHandle) -> Self {
        Self {
            public_key_pem: public_key_pem.into(),
            key,
        }
    }

    /// Derive the public key from a local key pair.
    pub fn from_key_pair(pair: Arc<Secp256k1KeyPair>) -> Result<Self, CryptoError> {
        let public_key_pem = pair.public_key().to_pem()?;
        Ok(Self::new(public_key_pem, KeyHandle::Local(pair)))
    }
}

impl Signer for PublicKeySigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(payload)
    }

    fn new_member(&self) -> Member {
        member("", MemberType::PublicKey, self.public_key_pem.as_bytes().to_vec())
    }
}

/// Permissioned-with-key identity: public key scoped to an org.
#[derive(Debug, Clone)]
pub struct PermissionedKeySigner {
    org_id: String,
    inner: PublicKeySigner,
}

impl PermissionedKeySigner {
    pub fn new(org_id: impl Into<String>, inner: PublicKeySigner) -> Self {
        Self {
            org_id: org_id.into(),
            inner,
        }
    }
}

impl Signer for PermissionedKeySigner {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner.sign(payload)
    }

    fn new_member(&self) -> Member {
        let mut m = self.inner.new_member();
        m.org_id = self.org_id.clone();
        m
    }
}
