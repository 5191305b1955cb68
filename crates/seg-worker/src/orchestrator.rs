//! Capabilities consumed by the segment handler.
//!
//! The handler never touches a concrete backend. Production wiring lives in
//! [`Node`](crate::node::Node); tests use
//! [`MockOrchestrator`](crate::mock::MockOrchestrator).

use std::fmt;
use std::io;
use std::sync::Arc;

use seg_protocol::{Address, ManifestId, Payment, SegmentMetadata};
use thiserror::Error;

/// Raw segment handed to the transcode dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub seq_no: u64,
    pub duration_ms: u64,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(md: &SegmentMetadata, data: Vec<u8>) -> Self {
        Self {
            seq_no: md.seq_no,
            duration_ms: md.duration_ms,
            data,
        }
    }
}

/// Rejection from the settlement hook.
///
/// The message is shown to the submitter as-is, so it must be safe to display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SettlementError(pub String);

impl SettlementError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from the transcode dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    #[error("{0}")]
    Failed(String),

    #[error("transcoder unavailable: {0}")]
    Unavailable(String),
}

/// Errors from persisting a single output.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("{0}")]
    Rejected(String),
}

/// Storage session for the outputs of one transcode.
pub trait OutputSession: Send + Sync {
    /// Persist `data` under `name` and return a retrievable reference.
    fn save_data(&self, name: &str, data: &[u8]) -> Result<String, StoreError>;
}

/// Successful dispatcher result.
pub struct TranscodeOutcome {
    /// One buffer per requested profile, in profile order.
    pub data: Vec<Vec<u8>>,
    /// Detached signature over the outputs.
    pub sig: Vec<u8>,
    /// Where the outputs get persisted.
    pub session: Arc<dyn OutputSession>,
}

impl fmt::Debug for TranscodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscodeOutcome")
            .field("outputs", &self.data.len())
            .field("sig", &hex::encode(&self.sig))
            .finish_non_exhaustive()
    }
}

/// The capability set a worker provides to the segment handler.
pub trait Orchestrator: Send + Sync {
    /// Check that `sig` over `message` was produced by `address`.
    fn verify_sig(&self, address: &Address, message: &[u8], sig: &[u8]) -> bool;

    /// Apply a payment against the manifest's balance.
    fn process_payment(
        &self,
        payment: &Payment,
        manifest_id: &ManifestId,
    ) -> Result<(), SettlementError>;

    /// Transcode a verified segment into the requested profiles.
    fn transcode_seg(
        &self,
        md: &SegmentMetadata,
        segment: &Segment,
    ) -> Result<TranscodeOutcome, TranscodeError>;
}
