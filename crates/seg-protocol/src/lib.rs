//! Segment Protocol Types
//!
//! Defines the wire formats exchanged between a submitter and a transcoding
//! worker: the signed segment credential, the payment header, and the
//! transcode result returned in the response body.

pub mod address;
pub mod credential;
pub mod error;
pub mod payment;
pub mod profile;
pub mod result;

pub use address::Address;
pub use credential::{
    decode_seg_creds, encode_seg_creds, segment_hash, ManifestId, SegData, SegmentMetadata,
};
pub use error::{AddressError, CredentialError, PaymentError, ResultError};
pub use payment::{
    decode_payment, encode_payment, Payment, PriceInfo, TicketExpirationParams, TicketParams,
    TicketSenderParams,
};
pub use profile::VideoProfile;
pub use result::{decode_result, TranscodeData, TranscodeResult, TranscodedSegmentData};

/// Header carrying the base64-encoded [`Payment`]. May be empty.
pub const PAYMENT_HEADER: &str = "seg-payment";

/// Header carrying the base64-encoded, signed [`SegData`] credential.
pub const SEGMENT_HEADER: &str = "seg-creds";

/// Header carrying the submitter's claimed [`Address`].
/// Absent means the zero address.
pub const SENDER_HEADER: &str = "seg-sender";

/// Content type of an encoded [`TranscodeResult`] body.
pub const RESULT_CONTENT_TYPE: &str = "application/x-protobuf";

/// Path the worker serves segment submissions on.
pub const SEGMENT_PATH: &str = "/segment";
