//! # Request Keys (secp256k1)
//!
//! Client keys sign payload bytes; nodes check the signature against the
//! member carried in the request. Signatures are ECDSA over SHA-256 with
//! RFC 6979 nonces, encoded as the fixed 64-byte `r ∥ s`.
//!
//! Private keys arrive as PEM, PKCS#8 (`PRIVATE KEY`) or SEC1
//! (`EC PRIVATE KEY`). Public keys leave as SubjectPublicKeyInfo PEM.

use crate::CryptoError;
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use zeroize::Zeroizing;

const COMPRESSED_LEN: usize = 33;

/// Public half of a request key, kept in compressed SEC1 form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; COMPRESSED_LEN]);

impl Secp256k1PublicKey {
    pub fn from_bytes(compressed: [u8; COMPRESSED_LEN]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(&compressed).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(compressed))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut compressed = [0u8; COMPRESSED_LEN];
        compressed.copy_from_slice(point.as_bytes());
        Self(compressed)
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_LEN] {
        &self.0
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// SubjectPublicKeyInfo PEM, the form carried in public-key members.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.verifying_key()?
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Check a 64-byte `r ∥ s` signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        self.verifying_key()?
            .verify(message, &signature)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// A client's request signing key. `SigningKey` wipes itself on drop.
pub struct Secp256k1KeyPair {
    secret: SigningKey,
    public: Secp256k1PublicKey,
}

impl Secp256k1KeyPair {
    fn from_signing_key(secret: SigningKey) -> Self {
        let public = Secp256k1PublicKey::from_verifying_key(secret.verifying_key());
        Self { secret, public }
    }

    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Raw 32-byte scalar.
    pub fn from_bytes(scalar: [u8; 32]) -> Result<Self, CryptoError> {
        SigningKey::from_slice(&scalar)
            .map(Self::from_signing_key)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
    }

    /// PKCS#8 first, then SEC1.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        let text = Zeroizing::new(
            String::from_utf8(pem.to_vec())
                .map_err(|_| CryptoError::InvalidPrivateKey("key is not utf-8 PEM".into()))?,
        );
        let secret = match SigningKey::from_pkcs8_pem(&text) {
            Ok(key) => key,
            Err(_) => k256::SecretKey::from_sec1_pem(&text)
                .map(SigningKey::from)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?,
        };
        Ok(Self::from_signing_key(secret))
    }

    pub fn public_key(&self) -> Secp256k1PublicKey {
        self.public
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.secret.sign(message);
        signature.to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1KeyPair({})", hex::encode(self.public.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::pkcs8::EncodePrivateKey;

    fn fixed_key() -> Secp256k1KeyPair {
        Secp256k1KeyPair::from_bytes([0x42; 32]).unwrap()
    }

    #[test]
    fn test_payload_signature_verifies_under_member_key() {
        let key = fixed_key();
        let payload = b"chain1/asset/mint";
        let signature = key.sign(payload);

        assert_eq!(signature.len(), 64);
        key.public_key().verify(payload, &signature).unwrap();
        assert!(matches!(
            key.public_key().verify(b"chain1/asset/burn", &signature),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_rfc6979_signatures_repeat() {
        assert_eq!(fixed_key().sign(b"tx"), fixed_key().sign(b"tx"));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let key = fixed_key();
        let signature = key.sign(b"tx");
        assert!(matches!(
            key.public_key().verify(b"tx", &signature[..40]),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn test_pkcs8_and_sec1_load_the_same_key() {
        let secret = k256::SecretKey::from_slice(&[0x42; 32]).unwrap();
        let pkcs8 = secret.to_pkcs8_pem(LineEnding::LF).unwrap();
        let sec1 = secret.to_sec1_pem(LineEnding::LF).unwrap();

        let a = Secp256k1KeyPair::from_pem(pkcs8.as_bytes()).unwrap();
        let b = Secp256k1KeyPair::from_pem(sec1.as_bytes()).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.public_key(), fixed_key().public_key());
    }

    #[test]
    fn test_garbage_pem_rejected() {
        assert!(matches!(
            Secp256k1KeyPair::from_pem(b"not a key"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_public_key_round_trips_through_compressed_bytes() {
        let public = Secp256k1KeyPair::generate().public_key();
        assert!(matches!(public.as_bytes()[0], 0x02 | 0x03));
        assert_eq!(Secp256k1PublicKey::from_bytes(*public.as_bytes()).unwrap(), public);
        assert!(public.to_pem().unwrap().starts_with("-----BEGIN PUBLIC KEY-----"));
    }
}
