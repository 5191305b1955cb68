//! Seglane - submitter tooling for the segment transcoding lane
//!
//! Generates submitter keys, signs segment credentials for a worker, and
//! inspects the results it sends back. The wire types live in
//! `seg-protocol`; the worker itself lives in `seg-worker`.

pub mod broadcaster;
pub mod keys;

pub use broadcaster::{
    gen_seg_creds, ticket_payment, win_prob_from_f64, ResultSummary, SegmentSigner,
};
pub use keys::{address_of, generate_keypair, KeyError};
