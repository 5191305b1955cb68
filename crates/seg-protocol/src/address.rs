//! Submitter addresses.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::AddressError;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identifier.
///
/// Derived from the trailing bytes of SHA-256 over an Ed25519 public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address, used when no sender is claimed.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Derive the address of a raw Ed25519 public key.
    pub fn from_public_key(key: &[u8]) -> Self {
        let digest = Sha256::digest(key);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Self(out)
    }

    /// Build an address from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::Length(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        Self::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let addr = Address::from_public_key(&[7u8; 32]);
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!(text[2..].parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = "0xdeadbeef".parse::<Address>().unwrap_err();
        assert_eq!(err, AddressError::Length(4));
    }

    #[test]
    fn test_parse_bad_hex() {
        assert!(matches!("0xzz".parse::<Address>(), Err(AddressError::Hex(_))));
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        let a = Address::from_public_key(&[1u8; 32]);
        let b = Address::from_public_key(&[2u8; 32]);
        assert_ne!(a, b);
        assert!(!a.is_zero());
        assert!(Address::default().is_zero());
    }
}
