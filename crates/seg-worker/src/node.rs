//! Production capability set.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use seg_protocol::{segment_hash, Address, ManifestId, Payment, SegmentMetadata};
use tracing::{info, warn};

use crate::config::{ConfigError, StorageConfig, WorkerConfig};
use crate::keyring::{decode_signing_key, Keyring};
use crate::ledger::{Ledger, LedgerConfig};
use crate::orchestrator::{
    Orchestrator, Segment, SettlementError, TranscodeError, TranscodeOutcome,
};
use crate::storage::{FsStore, MemoryStore, ObjectStore};
use crate::transcoder::{FfmpegTranscoder, SegmentTranscoder};

/// A worker backed by the keyring, ledger, a transcoder, and an object store.
pub struct Node {
    keyring: Keyring,
    ledger: Ledger,
    transcoder: Box<dyn SegmentTranscoder>,
    store: Box<dyn ObjectStore>,
    signing_key: SigningKey,
}

impl Node {
    pub fn new(
        keyring: Keyring,
        ledger: Ledger,
        transcoder: Box<dyn SegmentTranscoder>,
        store: Box<dyn ObjectStore>,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            keyring,
            ledger,
            transcoder,
            store,
            signing_key,
        }
    }

    /// Wire up a node from configuration.
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let keyring = Keyring::from_encoded(config.broadcasters.iter().map(String::as_str))
            .map_err(|e| ConfigError::InvalidKey(format!("broadcasters: {}", e)))?;
        if keyring.is_empty() {
            warn!("no broadcaster keys configured; every credential will be rejected");
        }

        let ledger = Ledger::new(LedgerConfig {
            price_per_segment: config.price_per_segment,
            recipient: config.recipient_address()?,
        });

        let store: Box<dyn ObjectStore> = match &config.storage {
            StorageConfig::Memory => Box::new(MemoryStore::new()),
            StorageConfig::Fs { root } => Box::new(
                FsStore::new(root).map_err(|e| ConfigError::Storage(e.to_string()))?,
            ),
        };

        let signing_key = match &config.signing_key {
            Some(encoded) => decode_signing_key(encoded)
                .map_err(|e| ConfigError::InvalidKey(format!("signing_key: {}", e)))?,
            None => {
                info!("no signing key configured; using an ephemeral key");
                SigningKey::generate(&mut rand::thread_rng())
            }
        };

        let node = Self::new(
            keyring,
            ledger,
            Box::new(FfmpegTranscoder::new(&config.ffmpeg)),
            store,
            signing_key,
        );
        info!(address = %node.address(), broadcasters = node.keyring.len(), "node ready");
        Ok(node)
    }

    /// This worker's address, derived from its signing key.
    pub fn address(&self) -> Address {
        Address::from_public_key(self.signing_key.verifying_key().as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl Orchestrator for Node {
    fn verify_sig(&self, address: &Address, message: &[u8], sig: &[u8]) -> bool {
        self.keyring.verify(address, message, sig)
    }

    fn process_payment(
        &self,
        payment: &Payment,
        manifest_id: &ManifestId,
    ) -> Result<(), SettlementError> {
        self.ledger.process_payment(payment, manifest_id, &self.keyring)
    }

    fn transcode_seg(
        &self,
        md: &SegmentMetadata,
        segment: &Segment,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let data = self.transcoder.transcode(segment, &md.profiles)?;
        let sig = sign_outputs(&self.signing_key, &data);
        let session = self
            .store
            .new_session(None)
            .map_err(|e| TranscodeError::Unavailable(format!("object store: {}", e)))?;
        Ok(TranscodeOutcome { data, sig, session })
    }
}

/// Concatenated SHA-256 digests of the outputs, in order.
pub fn outputs_digest(outputs: &[Vec<u8>]) -> Vec<u8> {
    outputs.iter().flat_map(|o| segment_hash(o)).collect()
}

/// Sign the outputs' digest with the worker key.
pub fn sign_outputs(key: &SigningKey, outputs: &[Vec<u8>]) -> Vec<u8> {
    key.sign(&outputs_digest(outputs)).to_bytes().to_vec()
}

/// Check a worker's signature over a set of outputs.
pub fn verify_outputs(key: &VerifyingKey, outputs: &[Vec<u8>], sig: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(sig) else {
        return false;
    };
    key.verify(&outputs_digest(outputs), &signature).is_ok()
}
