//! Mock capability set for testing.
//!
//! [`MockOrchestrator`] returns configured answers and records every call so
//! tests can assert what the handler passed to each capability.
//! [`MockSession`] stores outputs in memory or fails every save.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seg_protocol::{Address, ManifestId, Payment, SegmentMetadata};

use crate::orchestrator::{
    Orchestrator, OutputSession, Segment, SettlementError, StoreError, TranscodeError,
    TranscodeOutcome,
};

/// Recorded `verify_sig` call: address, message, signature.
pub type VerifyCall = (Address, Vec<u8>, Vec<u8>);

/// What `transcode_seg` answers with.
#[derive(Clone)]
enum TranscodeReply {
    Error(String),
    Outcome {
        data: Vec<Vec<u8>>,
        sig: Vec<u8>,
        session: Arc<dyn OutputSession>,
    },
}

struct MockInner {
    sig_valid: bool,
    payment_error: Option<String>,
    transcode: TranscodeReply,
    verify_calls: Vec<VerifyCall>,
    payments: Vec<(Payment, ManifestId)>,
    transcodes: Vec<(SegmentMetadata, Segment)>,
}

/// Thread-safe scripted orchestrator.
pub struct MockOrchestrator {
    inner: Mutex<MockInner>,
}

impl Default for MockOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrchestrator {
    /// Signatures verify, payments settle, transcoding fails with
    /// "no transcode result configured".
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                sig_valid: true,
                payment_error: None,
                transcode: TranscodeReply::Error("no transcode result configured".to_string()),
                verify_calls: Vec::new(),
                payments: Vec::new(),
                transcodes: Vec::new(),
            }),
        }
    }

    pub fn with_sig_valid(self, valid: bool) -> Self {
        self.lock().sig_valid = valid;
        self
    }

    pub fn with_payment_error(self, message: impl Into<String>) -> Self {
        self.lock().payment_error = Some(message.into());
        self
    }

    pub fn with_transcode_error(self, message: impl Into<String>) -> Self {
        self.lock().transcode = TranscodeReply::Error(message.into());
        self
    }

    pub fn with_transcode_result(
        self,
        data: Vec<Vec<u8>>,
        sig: Vec<u8>,
        session: Arc<dyn OutputSession>,
    ) -> Self {
        self.lock().transcode = TranscodeReply::Outcome { data, sig, session };
        self
    }

    pub fn verify_calls(&self) -> Vec<VerifyCall> {
        self.lock().verify_calls.clone()
    }

    pub fn payments(&self) -> Vec<(Payment, ManifestId)> {
        self.lock().payments.clone()
    }

    pub fn transcodes(&self) -> Vec<(SegmentMetadata, Segment)> {
        self.lock().transcodes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Orchestrator for MockOrchestrator {
    fn verify_sig(&self, address: &Address, message: &[u8], sig: &[u8]) -> bool {
        let mut inner = self.lock();
        inner
            .verify_calls
            .push((*address, message.to_vec(), sig.to_vec()));
        inner.sig_valid
    }

    fn process_payment(
        &self,
        payment: &Payment,
        manifest_id: &ManifestId,
    ) -> Result<(), SettlementError> {
        let mut inner = self.lock();
        inner.payments.push((payment.clone(), manifest_id.clone()));
        match &inner.payment_error {
            Some(message) => Err(SettlementError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn transcode_seg(
        &self,
        md: &SegmentMetadata,
        segment: &Segment,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let mut inner = self.lock();
        inner.transcodes.push((md.clone(), segment.clone()));
        match &inner.transcode {
            TranscodeReply::Error(message) => Err(TranscodeError::Failed(message.clone())),
            TranscodeReply::Outcome { data, sig, session } => Ok(TranscodeOutcome {
                data: data.clone(),
                sig: sig.clone(),
                session: Arc::clone(session),
            }),
        }
    }
}

/// In-memory output session with optional failure injection.
#[derive(Debug, Default)]
pub struct MockSession {
    fail_with: Option<String>,
    /// When set, only these save indices (0-based, in call order) fail.
    fail_indices: Option<Vec<usize>>,
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    attempts: Mutex<usize>,
}

impl MockSession {
    /// Every save succeeds with `mock://<name>`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Saves at the given call indices fail with `message`; the rest succeed.
    pub fn failing_at(indices: Vec<usize>, message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            fail_indices: Some(indices),
            ..Self::default()
        }
    }

    /// Names and bytes of every successful save, in call order.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total number of save attempts, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSession for MockSession {
    fn save_data(&self, name: &str, data: &[u8]) -> Result<String, StoreError> {
        let index = {
            let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
            let index = *attempts;
            *attempts += 1;
            index
        };

        if let Some(message) = &self.fail_with {
            let fails = match &self.fail_indices {
                Some(indices) => indices.contains(&index),
                None => true,
            };
            if fails {
                return Err(StoreError::Rejected(message.clone()));
            }
        }

        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), data.to_vec()));
        Ok(format!("mock://{}", name))
    }
}
