//! TLS material for node channels.
//!
//! Trust roots come either inline (PEM strings) or from files; inline roots
//! win when both are configured.

use crate::domain::PoolError;
use shared_types::NodeDescriptor;
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

/// Client certificate and key presented when a node requires mutual TLS.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_len", &self.cert_pem.len())
            .finish()
    }
}

/// PEM-encoded trust roots for `node`.
pub fn load_trust_roots(node: &NodeDescriptor) -> Result<Vec<Vec<u8>>, PoolError> {
    let roots: Vec<Vec<u8>> = if !node.trust_roots.is_empty() {
        node.trust_roots
            .iter()
            .map(|pem| pem.as_bytes().to_vec())
            .collect()
    } else {
        node.trust_root_paths
            .iter()
            .map(|path| {
                std::fs::read(path).map_err(|e| PoolError::Tls {
                    address: node.address.clone(),
                    reason: format!("read {}: {}", path.display(), e),
                })
            })
            .collect::<Result<_, _>>()?
    };

    if roots.is_empty() {
        return Err(PoolError::Tls {
            address: node.address.clone(),
            reason: "TLS enabled but no trust roots configured".into(),
        });
    }
    Ok(roots)
}

pub fn client_tls_config(
    node: &NodeDescriptor,
    identity: Option<&ClientIdentity>,
) -> Result<ClientTlsConfig, PoolError> {
    let mut tls = ClientTlsConfig::new();
    for root in load_trust_roots(node)? {
        tls = tls.ca_certificate(Certificate::from_pem(root));
    }
    if !node.tls_host_name.is_empty() {
        tls = tls.domain_name(node.tls_host_name.clone());
    }
    if let Some(id) = identity {
        tls = tls.identity(Identity::from_pem(&id.cert_pem, &id.key_pem));
    }
    Ok(tls)
}
