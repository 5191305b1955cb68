//! Segment submission handler.
//!
//! Runs one request through the admission state machine:
//!
//! ```text
//! Start -> PaymentDecoded -> CredentialVerified -> Settled
//!       -> IntegrityChecked -> Transcoded -> Persisted -> Responded
//! ```
//!
//! Every failure before `Transcoded` short-circuits with a plain-text 402 or
//! 403. A transcode failure is still a 200 carrying the error variant of the
//! [`TranscodeResult`]. Persistence failures are dropped per output.

use std::fmt;

use seg_protocol::{
    decode_payment, Address, ResultError, SegmentMetadata, TranscodeResult, RESULT_CONTENT_TYPE,
};
use tracing::{debug, warn};

use crate::orchestrator::{Orchestrator, Segment, TranscodeOutcome};
use crate::verify::{check_segment_hash, verify_seg_creds};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Transport status of a segment response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    PaymentRequired,
    Forbidden,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::PaymentRequired => 402,
            Self::Forbidden => 403,
        }
    }
}

/// Progress of a request through the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    PaymentDecoded,
    CredentialVerified,
    Settled,
    IntegrityChecked,
    Transcoded,
    Persisted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PaymentDecoded => "payment_decoded",
            Self::CredentialVerified => "credential_verified",
            Self::Settled => "settled",
            Self::IntegrityChecked => "integrity_checked",
            Self::Transcoded => "transcoded",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Inbound segment submission, already separated from the transport.
#[derive(Debug, Clone, Default)]
pub struct SegmentRequest {
    /// Raw payment header value; empty when absent.
    pub payment_header: String,
    /// Raw credential header value; empty when absent.
    pub creds_header: String,
    /// Claimed submitter.
    pub sender: Address,
    /// Segment bytes.
    pub body: Vec<u8>,
}

/// Outbound response: status, body, and the body's content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResponse {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl SegmentResponse {
    fn text(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: message.into().into_bytes(),
        }
    }

    fn result(result: &TranscodeResult) -> Self {
        Self {
            status: Status::Ok,
            content_type: RESULT_CONTENT_TYPE,
            body: result.to_bytes(),
        }
    }

    /// Body as text, for the plain-text error responses.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as a transcode result.
    pub fn transcode_result(&self) -> Result<TranscodeResult, ResultError> {
        seg_protocol::decode_result(&self.body)
    }
}

/// Handle one segment submission.
pub fn serve_segment(orch: &dyn Orchestrator, request: SegmentRequest) -> SegmentResponse {
    let SegmentRequest {
        payment_header,
        creds_header,
        sender,
        body,
    } = request;

    let payment = match decode_payment(&payment_header) {
        Ok(payment) => payment,
        Err(e) => return reject(Stage::Start, Status::PaymentRequired, e.to_string()),
    };
    debug!(stage = %Stage::PaymentDecoded, tickets = payment.ticket_count());

    let md = match verify_seg_creds(orch, &creds_header, &sender) {
        Ok(md) => md,
        Err(e) => return reject(Stage::PaymentDecoded, Status::Forbidden, e.to_string()),
    };
    debug!(
        stage = %Stage::CredentialVerified,
        %sender,
        manifest_id = %md.manifest_id,
        seq = md.seq_no,
        profiles = md.profiles.len()
    );

    // Settlement is keyed on the verified credential's manifest.
    if let Err(e) = orch.process_payment(&payment, &md.manifest_id) {
        return reject(Stage::CredentialVerified, Status::PaymentRequired, e.to_string());
    }
    debug!(stage = %Stage::Settled, manifest_id = %md.manifest_id);

    // Payment stays consumed if this fails.
    if let Err(e) = check_segment_hash(&md, &body) {
        return reject(Stage::Settled, Status::Forbidden, e.to_string());
    }
    debug!(stage = %Stage::IntegrityChecked, bytes = body.len());

    let segment = Segment::new(&md, body);
    let outcome = match orch.transcode_seg(&md, &segment) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                manifest_id = %md.manifest_id,
                seq = md.seq_no,
                error = %e,
                "transcode failed"
            );
            return respond(&TranscodeResult::error(e.to_string()));
        }
    };
    debug!(stage = %Stage::Transcoded, outputs = outcome.data.len());

    let urls = persist_outputs(&md, &outcome);
    debug!(stage = %Stage::Persisted, saved = urls.len(), requested = md.profiles.len());

    respond(&TranscodeResult::data(outcome.sig, urls))
}

fn respond(result: &TranscodeResult) -> SegmentResponse {
    debug!(stage = %Stage::Responded, status = Status::Ok.code());
    SegmentResponse::result(result)
}

fn reject(stage: Stage, status: Status, message: String) -> SegmentResponse {
    warn!(%stage, status = status.code(), reason = %message, "segment rejected");
    SegmentResponse::text(status, message)
}

/// Persist each output in profile order, keeping only the references that
/// were saved.
fn persist_outputs(md: &SegmentMetadata, outcome: &TranscodeOutcome) -> Vec<String> {
    if outcome.data.len() > md.profiles.len() {
        warn!(
            outputs = outcome.data.len(),
            profiles = md.profiles.len(),
            "dropping outputs with no requested profile"
        );
    }

    md.profiles
        .iter()
        .zip(&outcome.data)
        .fold(Vec::new(), |mut urls, (profile, data)| {
            let name = format!("{}/{}.ts", profile.name, md.seq_no);
            match outcome.session.save_data(&name, data) {
                Ok(url) => urls.push(url),
                Err(e) => warn!(object = %name, error = %e, "failed to save output"),
            }
            urls
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockOrchestrator, MockSession};
    use seg_protocol::{encode_seg_creds, segment_hash, ManifestId, VideoProfile};
    use std::sync::Arc;

    fn creds(data: &[u8], profiles: Vec<VideoProfile>) -> (SegmentMetadata, String) {
        let md = SegmentMetadata {
            manifest_id: ManifestId::new("manifest-abc"),
            seq_no: 7,
            hash: segment_hash(data),
            profiles,
            duration_ms: 2000,
        };
        let header = encode_seg_creds(&md, b"sig");
        (md, header)
    }

    fn request(creds_header: String, body: &[u8]) -> SegmentRequest {
        SegmentRequest {
            payment_header: String::new(),
            creds_header,
            sender: Address::ZERO,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::PaymentRequired.code(), 402);
        assert_eq!(Status::Forbidden.code(), 403);
    }

    #[test]
    fn test_error_responses_are_plain_text() {
        let orch = MockOrchestrator::new();
        let resp = serve_segment(&orch, request("foo".to_string(), b""));
        assert_eq!(resp.status, Status::Forbidden);
        assert_eq!(resp.content_type, TEXT_CONTENT_TYPE);
        assert_eq!(resp.body_text(), "ErrSegEncoding");
    }

    #[test]
    fn test_outputs_named_by_profile_and_seq() {
        let session = Arc::new(MockSession::new());
        let profiles = vec![VideoProfile::p720p60fps16x9(), VideoProfile::p240p30fps16x9()];
        let orch = MockOrchestrator::new().with_transcode_result(
            vec![b"a".to_vec(), b"b".to_vec()],
            b"sig".to_vec(),
            session.clone(),
        );
        let (_, header) = creds(b"foo", profiles);

        let resp = serve_segment(&orch, request(header, b"foo"));
        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.content_type, RESULT_CONTENT_TYPE);

        let saved = session.saved();
        assert_eq!(saved[0], ("P720p60fps16x9/7.ts".to_string(), b"a".to_vec()));
        assert_eq!(saved[1], ("P240p30fps16x9/7.ts".to_string(), b"b".to_vec()));
    }

    #[test]
    fn test_surplus_outputs_not_persisted() {
        let session = Arc::new(MockSession::new());
        let orch = MockOrchestrator::new().with_transcode_result(
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            b"sig".to_vec(),
            session.clone(),
        );
        let (_, header) = creds(b"foo", vec![VideoProfile::p720p60fps16x9()]);

        let resp = serve_segment(&orch, request(header, b"foo"));
        let result = resp.transcode_result().unwrap();
        assert_eq!(result.as_data().unwrap().segments.len(), 1);
        assert_eq!(session.attempts(), 1);
    }

    #[test]
    fn test_partial_persist_failure_keeps_order() {
        let session = Arc::new(MockSession::failing_at(vec![1], "disk full"));
        let profiles = vec![
            VideoProfile::preset("P720p30fps16x9").unwrap(),
            VideoProfile::preset("P360p30fps16x9").unwrap(),
            VideoProfile::preset("P144p30fps16x9").unwrap(),
        ];
        let orch = MockOrchestrator::new().with_transcode_result(
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            b"sig".to_vec(),
            session,
        );
        let (_, header) = creds(b"foo", profiles);

        let resp = serve_segment(&orch, request(header, b"foo"));
        let result = resp.transcode_result().unwrap();
        let urls: Vec<&str> = result.as_data().unwrap().urls().collect();
        assert_eq!(urls, vec!["mock://P720p30fps16x9/7.ts", "mock://P144p30fps16x9/7.ts"]);
    }

    #[test]
    fn test_segment_carries_credential_sequence() {
        let orch = MockOrchestrator::new().with_transcode_error("boom");
        let (md, header) = creds(b"foo", Vec::new());

        serve_segment(&orch, request(header, b"foo"));

        let transcodes = orch.transcodes();
        assert_eq!(transcodes.len(), 1);
        assert_eq!(transcodes[0].0, md);
        assert_eq!(transcodes[0].1.seq_no, 7);
        assert_eq!(transcodes[0].1.duration_ms, 2000);
        assert_eq!(transcodes[0].1.data, b"foo");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Start.to_string(), "start");
        assert_eq!(Stage::CredentialVerified.to_string(), "credential_verified");
        assert_eq!(Stage::Responded.to_string(), "responded");
    }
}
