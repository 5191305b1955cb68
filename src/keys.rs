//! Ed25519 key material for submitters.
//!
//! Keys travel as base64 of their 32 raw bytes, the same encoding the worker
//! reads from its `broadcasters` list.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{SigningKey, VerifyingKey};
use seg_protocol::Address;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

pub type KeyResult<T> = Result<T, KeyError>;

pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

pub fn encode_signing_key(key: &SigningKey) -> String {
    STANDARD.encode(key.to_bytes())
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

fn decode_key_bytes(encoded: &str) -> KeyResult<[u8; 32]> {
    let bytes = STANDARD.decode(encoded.trim())?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| KeyError::InvalidKey(format!("expected 32 bytes, got {}", b.len())))
}

pub fn decode_signing_key(encoded: &str) -> KeyResult<SigningKey> {
    Ok(SigningKey::from_bytes(&decode_key_bytes(encoded)?))
}

pub fn decode_verifying_key(encoded: &str) -> KeyResult<VerifyingKey> {
    VerifyingKey::from_bytes(&decode_key_bytes(encoded)?)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// Read a base64 signing key from a file.
pub fn load_signing_key(path: &Path) -> KeyResult<SigningKey> {
    decode_signing_key(&fs::read_to_string(path)?)
}

/// The address a worker's keyring files this key under.
pub fn address_of(key: &VerifyingKey) -> Address {
    Address::from_public_key(key.as_bytes())
}

/// SHA-256 fingerprint of a verifying key, hex encoded.
pub fn fingerprint(key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
