//! Ed25519 keyring for submitter signature verification.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use seg_protocol::Address;
use thiserror::Error;

/// Errors from loading keys.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Known submitters, indexed by address.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<Address, VerifyingKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyring from base64-encoded verifying keys.
    pub fn from_encoded<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Self, KeyError> {
        let mut keyring = Self::new();
        for encoded in keys {
            keyring.insert(decode_verifying_key(encoded)?);
        }
        Ok(keyring)
    }

    /// Register a key and return its address.
    pub fn insert(&mut self, key: VerifyingKey) -> Address {
        let address = Address::from_public_key(key.as_bytes());
        self.keys.insert(address, key);
        address
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Unknown addresses and malformed signatures verify as `false`.
    pub fn verify(&self, address: &Address, message: &[u8], sig: &[u8]) -> bool {
        let Some(key) = self.keys.get(address) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(sig) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}

/// Decode a base64 Ed25519 verifying key.
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::InvalidKey("key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes_array).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// Decode a base64 Ed25519 signing key.
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey, KeyError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyError::InvalidKey("key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&bytes_array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Signer;

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut rand::thread_rng())
    }

    #[test]
    fn test_verify_known_key() {
        let key = keypair();
        let mut keyring = Keyring::new();
        let address = keyring.insert(key.verifying_key());

        let sig = key.sign(b"message").to_bytes();
        assert!(keyring.verify(&address, b"message", &sig));
        assert!(!keyring.verify(&address, b"tampered", &sig));
    }

    #[test]
    fn test_unknown_address_rejected() {
        let key = keypair();
        let keyring = Keyring::new();
        let address = Address::from_public_key(key.verifying_key().as_bytes());
        let sig = key.sign(b"message").to_bytes();
        assert!(!keyring.verify(&address, b"message", &sig));
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let registered = keypair();
        let other = keypair();
        let mut keyring = Keyring::new();
        let address = keyring.insert(registered.verifying_key());

        let sig = other.sign(b"message").to_bytes();
        assert!(!keyring.verify(&address, b"message", &sig));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let key = keypair();
        let mut keyring = Keyring::new();
        let address = keyring.insert(key.verifying_key());
        assert!(!keyring.verify(&address, b"message", b"short"));
    }

    #[test]
    fn test_from_encoded() {
        let key = keypair();
        let encoded = STANDARD.encode(key.verifying_key().as_bytes());
        let keyring = Keyring::from_encoded([encoded.as_str()]).unwrap();
        assert_eq!(keyring.len(), 1);
        assert!(keyring.contains(&Address::from_public_key(key.verifying_key().as_bytes())));

        assert!(matches!(
            Keyring::from_encoded(["AAAA"]),
            Err(KeyError::InvalidKey(_))
        ));
        assert!(matches!(
            Keyring::from_encoded(["not base64!"]),
            Err(KeyError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_signing_key() {
        let key = keypair();
        let decoded = decode_signing_key(&STANDARD.encode(key.to_bytes())).unwrap();
        assert_eq!(decoded.verifying_key(), key.verifying_key());
    }
}
