//! Credential verification and payload integrity.

use seg_protocol::{decode_seg_creds, segment_hash, Address, CredentialError, SegmentMetadata};
use thiserror::Error;

use crate::orchestrator::Orchestrator;

/// The segment bytes do not match the credential's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Forbidden")]
pub struct IntegrityError;

/// Decode the credential header and verify its signature against `sender`.
pub fn verify_seg_creds(
    orch: &dyn Orchestrator,
    header: &str,
    sender: &Address,
) -> Result<SegmentMetadata, CredentialError> {
    let (md, sig) = decode_seg_creds(header)?;
    if !orch.verify_sig(sender, &md.flatten(), &sig) {
        return Err(CredentialError::Signature);
    }
    Ok(md)
}

/// Recompute the hash of the received bytes and compare with the credential.
pub fn check_segment_hash(md: &SegmentMetadata, data: &[u8]) -> Result<(), IntegrityError> {
    if segment_hash(data) != md.hash {
        return Err(IntegrityError);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOrchestrator;
    use seg_protocol::{encode_seg_creds, ManifestId};

    fn metadata(data: &[u8]) -> SegmentMetadata {
        SegmentMetadata {
            manifest_id: ManifestId::new("manifest"),
            seq_no: 3,
            hash: segment_hash(data),
            profiles: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_verify_passes_flattened_metadata() {
        let orch = MockOrchestrator::new();
        let md = metadata(b"foo");
        let creds = encode_seg_creds(&md, b"sig");
        let sender = Address([9u8; 20]);

        let verified = verify_seg_creds(&orch, &creds, &sender).unwrap();
        assert_eq!(verified, md);

        let calls = orch.verify_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, sender);
        assert_eq!(calls[0].1, md.flatten());
        assert_eq!(calls[0].2, b"sig");
    }

    #[test]
    fn test_verify_rejects_bad_signature() {
        let orch = MockOrchestrator::new().with_sig_valid(false);
        let creds = encode_seg_creds(&metadata(b"foo"), b"sig");
        let err = verify_seg_creds(&orch, &creds, &Address::ZERO).unwrap_err();
        assert_eq!(err, CredentialError::Signature);
    }

    #[test]
    fn test_verify_rejects_encoding_before_signature() {
        let orch = MockOrchestrator::new();
        let err = verify_seg_creds(&orch, "foo", &Address::ZERO).unwrap_err();
        assert_eq!(err, CredentialError::Encoding);
        assert!(orch.verify_calls().is_empty());
    }

    #[test]
    fn test_hash_check() {
        let md = metadata(b"foo");
        assert!(check_segment_hash(&md, b"foo").is_ok());
        let err = check_segment_hash(&md, b"bar").unwrap_err();
        assert_eq!(err.to_string(), "Forbidden");
    }
}
