//! Payment header codec.
//!
//! A payment is a batch of probabilistic tickets sharing one set of ticket
//! parameters. The zero-value [`Payment`] means no payment is attached.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prost::Message;

use crate::address::Address;
use crate::error::PaymentError;

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TicketParams {
    /// Address of the worker the tickets pay.
    #[prost(bytes = "vec", tag = "1")]
    pub recipient: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub face_value: u64,
    /// Winning probability as a fraction of 2^64.
    #[prost(uint64, tag = "3")]
    pub win_prob: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub recipient_rand_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub seed: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TicketExpirationParams {
    #[prost(int64, tag = "1")]
    pub creation_round: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub creation_round_block_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TicketSenderParams {
    #[prost(uint32, tag = "1")]
    pub sender_nonce: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct PriceInfo {
    #[prost(int64, tag = "1")]
    pub price_per_unit: i64,
    #[prost(int64, tag = "2")]
    pub pixels_per_unit: i64,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Payment {
    #[prost(message, optional, tag = "1")]
    pub ticket_params: Option<TicketParams>,
    #[prost(bytes = "vec", tag = "2")]
    pub sender: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub expiration_params: Option<TicketExpirationParams>,
    #[prost(message, repeated, tag = "4")]
    pub ticket_sender_params: Vec<TicketSenderParams>,
    #[prost(message, optional, tag = "5")]
    pub expected_price: Option<PriceInfo>,
}

impl TicketParams {
    /// Bytes a ticket sender signs for the ticket with `sender_nonce`:
    /// `recipient_rand_hash` followed by the big-endian nonce.
    pub fn ticket_message(&self, sender_nonce: u32) -> Vec<u8> {
        [self.recipient_rand_hash.as_slice(), &sender_nonce.to_be_bytes()].concat()
    }
}

impl Payment {
    /// True for the zero value, i.e. no payment attached.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of tickets carried.
    pub fn ticket_count(&self) -> usize {
        self.ticket_sender_params.len()
    }

    /// The paying account, if the sender field holds a valid address.
    pub fn sender_address(&self) -> Option<Address> {
        Address::from_slice(&self.sender).ok()
    }
}

/// Decode the payment header.
///
/// An empty header decodes to [`Payment::default`].
pub fn decode_payment(header: &str) -> Result<Payment, PaymentError> {
    let header = header.trim();
    if header.is_empty() {
        return Ok(Payment::default());
    }
    let raw = STANDARD.decode(header)?;
    Ok(Payment::decode(raw.as_slice())?)
}

/// Encode a payment as a header value. The zero value encodes to `""`.
pub fn encode_payment(payment: &Payment) -> String {
    if payment.is_empty() {
        return String::new();
    }
    STANDARD.encode(payment.encode_to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payment() -> Payment {
        Payment {
            ticket_params: Some(TicketParams {
                recipient: vec![0xaa; 20],
                face_value: 1_000,
                win_prob: u64::MAX / 2,
                recipient_rand_hash: vec![0x01; 32],
                seed: vec![0x02; 32],
            }),
            sender: vec![0xbb; 20],
            expiration_params: Some(TicketExpirationParams {
                creation_round: 10,
                creation_round_block_hash: vec![0x03; 32],
            }),
            ticket_sender_params: vec![
                TicketSenderParams { sender_nonce: 1, sig: vec![0x04; 64] },
                TicketSenderParams { sender_nonce: 2, sig: vec![0x05; 64] },
            ],
            expected_price: Some(PriceInfo { price_per_unit: 1, pixels_per_unit: 1 }),
        }
    }

    #[test]
    fn test_empty_header_is_no_payment() {
        let payment = decode_payment("").unwrap();
        assert!(payment.is_empty());
        assert_eq!(payment.ticket_count(), 0);
    }

    #[test]
    fn test_zero_payment_encodes_empty() {
        assert_eq!(encode_payment(&Payment::default()), "");
    }

    #[test]
    fn test_encode_decode() {
        let payment = sample_payment();
        let header = encode_payment(&payment);
        let decoded = decode_payment(&header).unwrap();
        assert_eq!(decoded, payment);
        assert_eq!(decoded.ticket_count(), 2);
        assert_eq!(decoded.sender_address(), Some(Address([0xbb; 20])));
    }

    #[test]
    fn test_bad_base64_mentions_base64() {
        let err = decode_payment("foo").unwrap_err();
        assert!(matches!(err, PaymentError::Base64(_)));
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_ticket_message_binds_nonce() {
        let params = sample_payment().ticket_params.unwrap();
        let message = params.ticket_message(0x0102_0304);
        assert_eq!(&message[..32], &[0x01; 32][..]);
        assert_eq!(&message[32..], &[1, 2, 3, 4][..]);
        assert_ne!(params.ticket_message(1), params.ticket_message(2));
    }

    #[test]
    fn test_bad_protobuf() {
        let header = STANDARD.encode([0x0a, 0x7f]);
        let err = decode_payment(&header).unwrap_err();
        assert!(matches!(err, PaymentError::Decode(_)));
    }
}
