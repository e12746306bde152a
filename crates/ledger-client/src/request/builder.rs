//! # Request Builder
//!
//! Payload assembly and endorsement. The sender signs the prost encoding of
//! the payload; co-endorsers and the fee payer sign the same bytes.

use shared_crypto::{generate_tx_id, CryptoError, Signer, TxIdScheme};
use shared_types::proto::{self, KeyValuePair, Limit, Payload, TxRequest, TxType};
use std::time::{SystemTime, UNIX_EPOCH};

/// Builds one payload. A missing tx id is generated with the session's
/// scheme when the payload is built.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    payload: Payload,
    scheme: TxIdScheme,
}

impl PayloadBuilder {
    pub fn new(chain_id: impl Into<String>, tx_type: TxType, scheme: TxIdScheme) -> Self {
        Self {
            payload: Payload {
                chain_id: chain_id.into(),
                tx_type: tx_type as i32,
                ..Payload::default()
            },
            scheme,
        }
    }

    pub fn contract(mut self, name: impl Into<String>, method: impl Into<String>) -> Self {
        self.payload.contract_name = name.into();
        self.payload.method = method.into();
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.payload.parameters.push(KeyValuePair::new(key, value));
        self
    }

    /// Appends in order; parameter order is part of the signed bytes.
    pub fn parameters(mut self, params: impl IntoIterator<Item = KeyValuePair>) -> Self {
        self.payload.parameters.extend(params);
        self
    }

    /// Use a caller-chosen id. Empty means generate.
    pub fn tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.payload.tx_id = tx_id.into();
        self
    }

    pub fn sequence(mut self, sequence: u64) -> Self {
        self.payload.sequence = sequence;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.payload.limit = Some(Limit { gas_limit });
        self
    }

    /// Unix seconds after which the node drops the transaction.
    pub fn expiration_time(mut self, unix_secs: i64) -> Self {
        self.payload.expiration_time = unix_secs;
        self
    }

    pub fn build(mut self) -> Payload {
        if self.payload.tx_id.is_empty() {
            self.payload.tx_id = generate_tx_id(self.scheme);
        }
        if self.payload.timestamp == 0 {
            self.payload.timestamp = unix_now();
        }
        self.payload
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Wrap `payload` into a request endorsed by `sender`.
pub fn sign_request(payload: Payload, sender: &dyn Signer) -> Result<TxRequest, CryptoError> {
    let bytes = proto::encode(&payload);
    Ok(TxRequest {
        sender: Some(sender.endorse(&bytes)?),
        payload: Some(payload),
        endorsers: Vec::new(),
        payer: None,
    })
}

/// Add a co-endorsement over the request's payload.
pub fn add_endorsement(request: &mut TxRequest, signer: &dyn Signer) -> Result<(), CryptoError> {
    let bytes = payload_bytes(request)?;
    request.endorsers.push(signer.endorse(&bytes)?);
    Ok(())
}

/// Attach the account paying for the transaction.
pub fn set_payer(request: &mut TxRequest, signer: &dyn Signer) -> Result<(), CryptoError> {
    let bytes = payload_bytes(request)?;
    request.payer = Some(signer.endorse(&bytes)?);
    Ok(())
}

fn payload_bytes(request: &TxRequest) -> Result<Vec<u8>, CryptoError> {
    request
        .payload
        .as_ref()
        .map(proto::encode)
        .ok_or_else(|| CryptoError::InvalidInput("request has no payload".into()))
}
