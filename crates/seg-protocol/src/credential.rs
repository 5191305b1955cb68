//! Segment credential codec.
//!
//! A credential binds a segment to a manifest, a sequence number, the
//! requested output profiles, and the SHA-256 of the segment bytes. The
//! submitter signs the flattened credential; the result travels in the
//! [`SEGMENT_HEADER`](crate::SEGMENT_HEADER) as standard base64.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prost::Message;
use sha2::{Digest, Sha256};

use crate::error::CredentialError;
use crate::profile::VideoProfile;

/// Opaque identifier of a submitter's stream session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestId(pub String);

impl ManifestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManifestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Wire form of a segment credential.
#[derive(Clone, PartialEq, Message)]
pub struct SegData {
    #[prost(string, tag = "1")]
    pub manifest_id: String,
    #[prost(uint64, tag = "2")]
    pub seq: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub hash: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub profiles: Vec<VideoProfile>,
    #[prost(uint64, tag = "5")]
    pub duration_ms: u64,
    #[prost(bytes = "vec", tag = "6")]
    pub sig: Vec<u8>,
}

/// Decoded credential fields, without the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentMetadata {
    pub manifest_id: ManifestId,
    pub seq_no: u64,
    /// SHA-256 of the segment bytes the submitter intends to send.
    pub hash: Vec<u8>,
    pub profiles: Vec<VideoProfile>,
    pub duration_ms: u64,
}

impl SegmentMetadata {
    /// The exact bytes covered by the submitter's signature.
    pub fn flatten(&self) -> Vec<u8> {
        SegData::from_metadata(self, Vec::new()).encode_to_vec()
    }
}

impl SegData {
    fn from_metadata(md: &SegmentMetadata, sig: Vec<u8>) -> Self {
        Self {
            manifest_id: md.manifest_id.0.clone(),
            seq: md.seq_no,
            hash: md.hash.clone(),
            profiles: md.profiles.clone(),
            duration_ms: md.duration_ms,
            sig,
        }
    }

    fn into_parts(self) -> (SegmentMetadata, Vec<u8>) {
        let md = SegmentMetadata {
            manifest_id: ManifestId(self.manifest_id),
            seq_no: self.seq,
            hash: self.hash,
            profiles: self.profiles,
            duration_ms: self.duration_ms,
        };
        (md, self.sig)
    }
}

/// SHA-256 of the raw segment bytes.
pub fn segment_hash(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Encode metadata and its signature into a header value.
pub fn encode_seg_creds(md: &SegmentMetadata, sig: &[u8]) -> String {
    STANDARD.encode(SegData::from_metadata(md, sig.to_vec()).encode_to_vec())
}

/// Decode a header value into metadata and the detached signature.
///
/// Does not verify the signature. An empty header is an encoding error.
pub fn decode_seg_creds(header: &str) -> Result<(SegmentMetadata, Vec<u8>), CredentialError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(CredentialError::Encoding);
    }
    let raw = STANDARD
        .decode(header)
        .map_err(|_| CredentialError::Encoding)?;
    let data = SegData::decode(raw.as_slice()).map_err(|_| CredentialError::Encoding)?;
    Ok(data.into_parts())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> SegmentMetadata {
        SegmentMetadata {
            manifest_id: ManifestId::new("manifest-001"),
            seq_no: 42,
            hash: segment_hash(b"foo"),
            profiles: vec![VideoProfile::p720p60fps16x9(), VideoProfile::p240p30fps16x9()],
            duration_ms: 2000,
        }
    }

    #[test]
    fn test_encode_decode() {
        let md = sample_metadata();
        let header = encode_seg_creds(&md, b"signature");

        let (decoded, sig) = decode_seg_creds(&header).unwrap();
        assert_eq!(decoded, md);
        assert_eq!(sig, b"signature");
    }

    #[test]
    fn test_flatten_excludes_signature() {
        let md = sample_metadata();
        let header_a = encode_seg_creds(&md, b"sig-a");
        let header_b = encode_seg_creds(&md, b"sig-b");
        let (a, _) = decode_seg_creds(&header_a).unwrap();
        let (b, _) = decode_seg_creds(&header_b).unwrap();
        assert_eq!(a.flatten(), b.flatten());
    }

    #[test]
    fn test_flatten_covers_every_field() {
        let md = sample_metadata();
        let base = md.flatten();

        let mut changed = md.clone();
        changed.manifest_id = ManifestId::new("other");
        assert_ne!(changed.flatten(), base);

        let mut changed = md.clone();
        changed.seq_no += 1;
        assert_ne!(changed.flatten(), base);

        let mut changed = md.clone();
        changed.hash = segment_hash(b"bar");
        assert_ne!(changed.flatten(), base);

        let mut changed = md.clone();
        changed.profiles.pop();
        assert_ne!(changed.flatten(), base);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert_eq!(decode_seg_creds("foo"), Err(CredentialError::Encoding));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert_eq!(decode_seg_creds(""), Err(CredentialError::Encoding));
    }

    #[test]
    fn test_decode_rejects_non_protobuf() {
        // Valid base64, but a truncated length-delimited field.
        let header = STANDARD.encode([0x0a, 0x05, b'a']);
        assert_eq!(decode_seg_creds(&header), Err(CredentialError::Encoding));
    }

    #[test]
    fn test_error_text_is_stable() {
        assert_eq!(CredentialError::Encoding.to_string(), "ErrSegEncoding");
        assert_eq!(CredentialError::Signature.to_string(), "ErrSegSig");
    }
}
