//! Transcode result schema.
//!
//! The response body for every request that reaches the transcode stage.
//! A single oneof carries either the dispatcher's error text or the
//! outcome signature with the references of the persisted outputs.

use prost::Message;

use crate::error::ResultError;

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TranscodedSegmentData {
    #[prost(string, tag = "1")]
    pub url: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TranscodeData {
    /// Persisted outputs, dense and in profile order.
    #[prost(message, repeated, tag = "1")]
    pub segments: Vec<TranscodedSegmentData>,
    #[prost(bytes = "vec", tag = "2")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TranscodeResult {
    #[prost(oneof = "transcode_result::Result", tags = "1, 2")]
    pub result: Option<transcode_result::Result>,
}

pub mod transcode_result {
    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Result {
        #[prost(string, tag = "1")]
        Error(String),
        #[prost(message, tag = "2")]
        Data(super::TranscodeData),
    }
}

impl TranscodeResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: Some(transcode_result::Result::Error(message.into())),
        }
    }

    pub fn data(sig: Vec<u8>, urls: Vec<String>) -> Self {
        let segments = urls
            .into_iter()
            .map(|url| TranscodedSegmentData { url })
            .collect();
        Self {
            result: Some(transcode_result::Result::Data(TranscodeData { segments, sig })),
        }
    }

    /// The error variant's message, if this is an error.
    pub fn as_error(&self) -> Option<&str> {
        match &self.result {
            Some(transcode_result::Result::Error(e)) => Some(e),
            _ => None,
        }
    }

    /// The data variant, if this is a success.
    pub fn as_data(&self) -> Option<&TranscodeData> {
        match &self.result {
            Some(transcode_result::Result::Data(d)) => Some(d),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

impl TranscodeData {
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.url.as_str())
    }
}

/// Decode a response body. A message with no variant set is rejected.
pub fn decode_result(bytes: &[u8]) -> Result<TranscodeResult, ResultError> {
    let result = TranscodeResult::decode(bytes)?;
    if result.result.is_none() {
        return Err(ResultError::Empty);
    }
    Ok(result)
}
