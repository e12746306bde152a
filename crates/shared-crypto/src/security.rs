//! # Security Context
//!
//! HSM (pkcs11 / sdf) and KMS settings for one session. Built once when the
//! session is constructed and immutable afterwards; rotating keys or
//! switching key services means building a new session.
//!
//! When either service is enabled, the configured private-key material is
//! read as a utf-8 key id and signing is delegated to the [`ExternalSigner`]
//! supplied by the application.

use crate::{CryptoError, Secp256k1KeyPair};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hardware security module settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pkcs11Config {
    pub enabled: bool,
    /// `pkcs11` or `sdf`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Path to the vendor library.
    pub library: String,
    pub label: String,
    pub password: String,
    pub session_cache_size: usize,
    pub hash: String,
}

/// Remote key management service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KmsConfig {
    pub enabled: bool,
    pub is_public: bool,
    pub secret_id: String,
    pub secret_key: String,
    pub address: String,
    pub region: String,
    pub sdk_scheme: String,
    pub ext_params: String,
}

/// Signing delegated to an HSM or KMS.
pub trait ExternalSigner: Send + Sync {
    /// Sign `message` with the key named by `key_id`.
    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// A private key the signers can use.
#[derive(Clone)]
pub enum KeyHandle {
    Local(Arc<Secp256k1KeyPair>),
    External {
        key_id: String,
        signer: Arc<dyn ExternalSigner>,
    },
}

impl KeyHandle {
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            KeyHandle::Local(pair) => Ok(pair.sign(message)),
            KeyHandle::External { key_id, signer } => signer.sign(key_id, message),
        }
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyHandle::Local(pair) => f.debug_tuple("Local").field(pair).finish(),
            KeyHandle::External { key_id, .. } => {
                f.debug_struct("External").field("key_id", key_id).finish()
            }
        }
    }
}

/// Per-session security settings.
#[derive(Clone, Default)]
pub struct SecurityContext {
    pkcs11: Pkcs11Config,
    kms: KmsConfig,
    external: Option<Arc<dyn ExternalSigner>>,
}

impl SecurityContext {
    pub fn new(pkcs11: Pkcs11Config, kms: KmsConfig) -> Self {
        Self {
            pkcs11,
            kms,
            external: None,
        }
    }

    /// Attach the signer that talks to the HSM or KMS.
    pub fn with_external_signer(mut self, signer: Arc<dyn ExternalSigner>) -> Self {
        self.external = Some(signer);
        self
    }

    pub fn pkcs11(&self) -> &Pkcs11Config {
        &self.pkcs11
    }

    pub fn kms(&self) -> &KmsConfig {
        &self.kms
    }

    /// True when signing leaves the process.
    pub fn delegates(&self) -> bool {
        self.pkcs11.enabled || self.kms.enabled
    }

    /// Resolve configured key material into a handle.
    pub fn key_handle(&self, key_material: &[u8]) -> Result<KeyHandle, CryptoError> {
        if !self.delegates() {
            return Ok(KeyHandle::Local(Arc::new(Secp256k1KeyPair::from_pem(
                key_material,
            )?)));
        }

        let service = if self.pkcs11.enabled { "pkcs11" } else { "kms" };
        let signer = self
            .external
            .clone()
            .ok_or(CryptoError::ExternalSignerMissing(service))?;
        let key_id = std::str::from_utf8(key_material)
            .map_err(|_| CryptoError::InvalidInput("key id is not utf-8".into()))?
            .trim()
            .to_string();
        if key_id.is_empty() {
            return Err(CryptoError::InvalidInput("empty key id".into()));
        }
        tracing::debug!(service, key_id = %key_id, "using external signer");
        Ok(KeyHandle::External { key_id, signer })
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("pkcs11_enabled", &self.pkcs11.enabled)
            .field("kms_enabled", &self.kms.enabled)
            .field("external_signer", &self.external.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSigner;

    impl ExternalSigner for EchoSigner {
        fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
            let mut out = key_id.as_bytes().to_vec();
            out.extend_from_slice(message);
            Ok(out)
        }
    }

    fn kms_enabled() -> KmsConfig {
        KmsConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_context_is_local() {
        let ctx = SecurityContext::default();
        assert!(!ctx.delegates());
        assert!(ctx.key_handle(b"garbage").is_err());
    }

    #[test]
    fn test_delegation_without_signer_fails() {
        let ctx = SecurityContext::new(Pkcs11Config::default(), kms_enabled());
        let err = ctx.key_handle(b"key-1").unwrap_err();
        assert!(matches!(err, CryptoError::ExternalSignerMissing("kms")));
    }

    #[test]
    fn test_delegation_uses_key_id() {
        let ctx = SecurityContext::new(Pkcs11Config::default(), kms_enabled())
            .with_external_signer(Arc::new(EchoSigner));
        let handle = ctx.key_handle(b" key-1\n").unwrap();
        assert_eq!(handle.sign(b"!").unwrap(), b"key-1!".to_vec());
    }
}
