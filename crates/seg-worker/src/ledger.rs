//! In-memory payment ledger.
//!
//! Credits each ticket's expected value to the manifest's balance, then
//! debits the per-segment price. Credits stick even when the debit is
//! refused, and nothing is refunded if the request fails later on.
//!
//! Tickets are accepted only from senders in the keyring, and only when
//! every ticket signature verifies. Redeemed ticket ids are held for the
//! life of the process and never pruned, so memory grows with the number of
//! tickets accepted.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use seg_protocol::{Address, ManifestId, Payment};
use tracing::{debug, warn};

use crate::keyring::Keyring;
use crate::orchestrator::SettlementError;

pub const ERR_MISSING_SENDER: &str = "invalid payment: missing sender";
pub const ERR_MISSING_TICKET_PARAMS: &str = "invalid payment: missing ticket params";
pub const ERR_UNKNOWN_SENDER: &str = "unknown ticket sender";
pub const ERR_INVALID_TICKET_SIG: &str = "invalid ticket signature";
pub const ERR_INVALID_RECIPIENT: &str = "invalid ticket recipient";
pub const ERR_TICKET_REPLAY: &str = "ticket replay";
pub const ERR_INSUFFICIENT_BALANCE: &str = "insufficient balance";
pub const ERR_LEDGER_UNAVAILABLE: &str = "ledger unavailable";

/// Ledger pricing and ticket acceptance settings.
#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    /// Amount debited for every settled segment.
    pub price_per_segment: u64,
    /// When set, tickets must name this recipient.
    pub recipient: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TicketId {
    sender: Address,
    recipient_rand_hash: Vec<u8>,
    sender_nonce: u32,
}

#[derive(Debug, Default)]
struct LedgerInner {
    balances: HashMap<ManifestId, u128>,
    redeemed: HashSet<TicketId>,
}

/// Thread-safe per-manifest balance ledger.
#[derive(Debug, Default)]
pub struct Ledger {
    config: LedgerConfig,
    inner: RwLock<LedgerInner>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(LedgerInner::default()),
        }
    }

    /// Current balance of a manifest.
    pub fn balance(&self, manifest_id: &ManifestId) -> u128 {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.balances.get(manifest_id).copied().unwrap_or(0)
    }

    /// Apply `payment` to `manifest_id` and charge one segment.
    ///
    /// Ticket signatures are checked against `senders`.
    pub fn process_payment(
        &self,
        payment: &Payment,
        manifest_id: &ManifestId,
        senders: &Keyring,
    ) -> Result<(), SettlementError> {
        let (credit, tickets) = self.validate(payment, senders)?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| SettlementError::new(ERR_LEDGER_UNAVAILABLE))?;

        if tickets.iter().any(|id| inner.redeemed.contains(id)) {
            return Err(SettlementError::new(ERR_TICKET_REPLAY));
        }
        inner.redeemed.extend(tickets);

        let balance = inner.balances.entry(manifest_id.clone()).or_insert(0);
        *balance = balance.saturating_add(credit);

        let price = u128::from(self.config.price_per_segment);
        if *balance < price {
            debug!(%manifest_id, balance = %*balance, price = %price, "insufficient balance");
            return Err(SettlementError::new(ERR_INSUFFICIENT_BALANCE));
        }
        *balance -= price;
        debug!(%manifest_id, credit = %credit, balance = %*balance, "segment settled");
        Ok(())
    }

    /// Check the payment's shape and signatures, and compute its credit and
    /// ticket ids.
    fn validate(
        &self,
        payment: &Payment,
        senders: &Keyring,
    ) -> Result<(u128, Vec<TicketId>), SettlementError> {
        if payment.ticket_count() == 0 {
            return Ok((0, Vec::new()));
        }

        let sender = payment
            .sender_address()
            .ok_or_else(|| SettlementError::new(ERR_MISSING_SENDER))?;
        let params = payment
            .ticket_params
            .as_ref()
            .ok_or_else(|| SettlementError::new(ERR_MISSING_TICKET_PARAMS))?;

        if !senders.contains(&sender) {
            warn!(%sender, "ticket from unknown sender");
            return Err(SettlementError::new(ERR_UNKNOWN_SENDER));
        }

        if let Some(expected) = self.config.recipient {
            if params.recipient.as_slice() != expected.as_bytes() {
                return Err(SettlementError::new(ERR_INVALID_RECIPIENT));
            }
        }

        let mut ids = Vec::with_capacity(payment.ticket_count());
        for sender_params in &payment.ticket_sender_params {
            let message = params.ticket_message(sender_params.sender_nonce);
            if !senders.verify(&sender, &message, &sender_params.sig) {
                warn!(%sender, nonce = sender_params.sender_nonce, "bad ticket signature");
                return Err(SettlementError::new(ERR_INVALID_TICKET_SIG));
            }

            let id = TicketId {
                sender,
                recipient_rand_hash: params.recipient_rand_hash.clone(),
                sender_nonce: sender_params.sender_nonce,
            };
            if ids.contains(&id) {
                return Err(SettlementError::new(ERR_TICKET_REPLAY));
            }
            ids.push(id);
        }

        let per_ticket = ticket_expected_value(params.face_value, params.win_prob);
        let credit = per_ticket.saturating_mul(ids.len() as u128);
        Ok((credit, ids))
    }
}

/// `face_value * win_prob / 2^64`.
pub fn ticket_expected_value(face_value: u64, win_prob: u64) -> u128 {
    (u128::from(face_value) * u128::from(win_prob)) >> 64
}
