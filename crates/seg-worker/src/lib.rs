//! Segment Transcoding Worker
//!
//! Admits segment submissions over HTTP: decodes the payment, verifies the
//! signed credential, settles, checks the payload hash, transcodes, persists
//! the outputs, and answers with a [`TranscodeResult`](seg_protocol::TranscodeResult).
//!
//! This crate can be used in two modes:
//! - **Standalone binary**: `seg-worker --config worker.toml`
//! - **In-process library**: call [`serve_segment`] with any [`Orchestrator`],
//!   e.g. [`MockOrchestrator`] in tests

pub mod config;
pub mod handler;
pub mod keyring;
pub mod ledger;
pub mod mock;
pub mod node;
pub mod orchestrator;
pub mod server;
pub mod storage;
pub mod transcoder;
pub mod verify;

pub use config::{ConfigError, StorageConfig, WorkerConfig};
pub use handler::{serve_segment, SegmentRequest, SegmentResponse, Stage, Status};
pub use keyring::{KeyError, Keyring};
pub use ledger::{Ledger, LedgerConfig};
pub use mock::{MockOrchestrator, MockSession};
pub use node::{sign_outputs, verify_outputs, Node};
pub use orchestrator::{
    Orchestrator, OutputSession, Segment, SettlementError, StoreError, TranscodeError,
    TranscodeOutcome,
};
pub use storage::{FsStore, MemoryStore, ObjectStore};
pub use transcoder::{FfmpegTranscoder, SegmentTranscoder};
pub use verify::{check_segment_hash, verify_seg_creds, IntegrityError};
