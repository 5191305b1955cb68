//! Error types for the segment protocol codecs.

use thiserror::Error;

/// Errors from decoding or verifying a segment credential.
///
/// The display strings are stable and are written verbatim into
/// 403 response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The header was empty, not base64, or not a `SegData` message.
    #[error("ErrSegEncoding")]
    Encoding,
    /// The signature did not verify for the claimed sender.
    #[error("ErrSegSig")]
    Signature,
}

/// Errors from decoding the payment header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("invalid payment header: base64 decode error: {0}")]
    Base64(String),

    #[error("invalid payment header: protobuf decode error: {0}")]
    Decode(String),
}

/// Errors from decoding a transcode result body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultError {
    #[error("protobuf decode error: {0}")]
    Decode(String),

    #[error("transcode result has neither error nor data")]
    Empty,
}

/// Errors from parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("address must be 20 bytes, got {0}")]
    Length(usize),
}

impl From<base64::DecodeError> for PaymentError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Base64(e.to_string())
    }
}

impl From<prost::DecodeError> for PaymentError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<prost::DecodeError> for ResultError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<hex::FromHexError> for AddressError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Hex(e.to_string())
    }
}
