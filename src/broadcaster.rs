//! Submitter side of the segment credential and payment headers.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use seg_protocol::{
    encode_seg_creds, segment_hash, Address, ManifestId, Payment, SegmentMetadata,
    TicketParams, TicketSenderParams, TranscodeResult, VideoProfile,
};
use serde::Serialize;
use tracing::debug;

use crate::keys::address_of;

/// Signs segment metadata on behalf of one submitter.
#[derive(Debug, Clone)]
pub struct SegmentSigner {
    key: SigningKey,
}

impl SegmentSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Address to send in the sender header.
    pub fn address(&self) -> Address {
        address_of(&self.key.verifying_key())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Signature over the flattened metadata.
    pub fn sign(&self, md: &SegmentMetadata) -> Vec<u8> {
        self.key.sign(&md.flatten()).to_bytes().to_vec()
    }

    /// Signed credential header value.
    pub fn seg_creds(&self, md: &SegmentMetadata) -> String {
        encode_seg_creds(md, &self.sign(md))
    }
}

/// Build the metadata for `data` and return it with its signed credential.
pub fn gen_seg_creds(
    signer: &SegmentSigner,
    manifest_id: ManifestId,
    seq_no: u64,
    data: &[u8],
    profiles: Vec<VideoProfile>,
    duration_ms: u64,
) -> (SegmentMetadata, String) {
    let md = SegmentMetadata {
        manifest_id,
        seq_no,
        hash: segment_hash(data),
        profiles,
        duration_ms,
    };
    let creds = signer.seg_creds(&md);
    debug!(
        manifest_id = %md.manifest_id,
        seq = md.seq_no,
        bytes = data.len(),
        "signed segment credential"
    );
    (md, creds)
}

/// A batch of tickets from `sender` to `recipient`, one per nonce.
///
/// Each ticket is signed over [`TicketParams::ticket_message`].
pub fn ticket_payment(
    sender: &SegmentSigner,
    recipient: Address,
    face_value: u64,
    win_prob: u64,
    nonces: &[u32],
) -> Payment {
    let mut rng = rand::thread_rng();
    let mut recipient_rand_hash = vec![0u8; 32];
    let mut seed = vec![0u8; 32];
    rng.fill_bytes(&mut recipient_rand_hash);
    rng.fill_bytes(&mut seed);

    let params = TicketParams {
        recipient: recipient.as_bytes().to_vec(),
        face_value,
        win_prob,
        recipient_rand_hash,
        seed,
    };
    let ticket_sender_params = nonces
        .iter()
        .map(|&sender_nonce| TicketSenderParams {
            sender_nonce,
            sig: sender
                .key
                .sign(&params.ticket_message(sender_nonce))
                .to_bytes()
                .to_vec(),
        })
        .collect();

    Payment {
        ticket_params: Some(params),
        sender: sender.address().as_bytes().to_vec(),
        ticket_sender_params,
        ..Payment::default()
    }
}

/// Convert a probability in `[0, 1]` to a fraction of 2^64.
pub fn win_prob_from_f64(p: f64) -> u64 {
    if p.is_nan() || p <= 0.0 {
        0
    } else if p >= 1.0 {
        u64::MAX
    } else {
        (p * 18_446_744_073_709_551_616.0) as u64
    }
}

/// JSON view of a decoded transcode result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResultSummary {
    Error { message: String },
    Data { sig: String, segments: Vec<String> },
}

impl From<&TranscodeResult> for ResultSummary {
    fn from(result: &TranscodeResult) -> Self {
        match result.as_data() {
            Some(data) => Self::Data {
                sig: hex::encode(&data.sig),
                segments: data.urls().map(str::to_string).collect(),
            },
            None => Self::Error {
                message: result.as_error().unwrap_or_default().to_string(),
            },
        }
    }
}
