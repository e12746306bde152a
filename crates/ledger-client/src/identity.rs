//! # Identity
//!
//! Turns the identity section of the config into a request signer and an
//! optional mutual-TLS identity.
//!
//! | `authType` | Signer |
//! |------------|--------|
//! | `permissionedwithcert` | `AliasSigner` when `alias` is set, else `CertSigner` |
//! | `permissionedwithkey` | `PermissionedKeySigner` |
//! | `public` | `PublicKeySigner` |

use crate::container::config::{AuthType, ClientConfig, ConfigError};
use crate::errors::ClientError;
use lc_01_connection_pool::ClientIdentity;
use shared_crypto::{
    AliasSigner, CertSigner, KeyHandle, PermissionedKeySigner, PublicKeySigner, SecurityContext,
    Signer,
};
use std::sync::Arc;
use tracing::debug;

/// Build the signer for `config.auth_type`.
///
/// Key material goes through `security`, so an enabled HSM or KMS turns the
/// configured key into a key id for the external signer.
pub fn build_signer(
    config: &ClientConfig,
    security: &SecurityContext,
) -> Result<Arc<dyn Signer>, ClientError> {
    let key_source = config
        .sign_key_source()
        .ok_or_else(|| ConfigError::MissingField("userSignKey".into()))?;
    let key = security.key_handle(&key_source.load()?)?;

    let signer: Arc<dyn Signer> = match config.auth_type {
        AuthType::PermissionedWithCert if !config.alias.is_empty() => {
            debug!("[ledger-client] Signing as alias {}", config.alias);
            Arc::new(AliasSigner::new(&config.org_id, &config.alias, key))
        }
        AuthType::PermissionedWithCert => {
            let cert = config
                .sign_crt_source()
                .ok_or_else(|| ConfigError::MissingField("userSignCrt".into()))?
                .load()?;
            Arc::new(CertSigner::new(&config.org_id, cert, key))
        }
        AuthType::PermissionedWithKey => Arc::new(PermissionedKeySigner::new(
            &config.org_id,
            public_key_signer(key)?,
        )),
        AuthType::Public => Arc::new(public_key_signer(key)?),
    };
    Ok(signer)
}

/// Key modes put the public key on the wire, which needs the key locally.
fn public_key_signer(key: KeyHandle) -> Result<PublicKeySigner, ClientError> {
    match key {
        KeyHandle::Local(pair) => Ok(PublicKeySigner::from_key_pair(pair)?),
        KeyHandle::External { .. } => Err(ConfigError::invalid(
            "userSignKey",
            "key-based auth types need a local signing key",
        )
        .into()),
    }
}

/// Client certificate for nodes that require mutual TLS. `None` when no TLS
/// key pair is configured.
pub fn tls_identity(config: &ClientConfig) -> Result<Option<ClientIdentity>, ConfigError> {
    match (config.tls_key_source(), config.tls_crt_source()) {
        (Some(key), Some(crt)) => Ok(Some(ClientIdentity {
            cert_pem: crt.load()?,
            key_pem: key.load()?,
        })),
        (Some(_), None) => Err(ConfigError::MissingField("userCrt".into())),
        (None, Some(_)) => Err(ConfigError::MissingField("userKey".into())),
        (None, None) => Ok(None),
    }
}
