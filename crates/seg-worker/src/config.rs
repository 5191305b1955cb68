//! Worker configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file is a
//! valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use seg_protocol::Address;
use serde::Deserialize;
use thiserror::Error;

/// Errors from loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("storage: {0}")]
    Storage(String),
}

/// Where transcoded outputs are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Fs {
        root: PathBuf,
    },
}

/// Worker configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Socket address the HTTP transport binds.
    pub listen: String,
    /// Largest accepted segment body in bytes.
    pub max_segment_bytes: usize,
    /// Amount debited from a manifest's balance per segment.
    pub price_per_segment: u64,
    /// This worker's ticket recipient address; unchecked when unset.
    pub recipient: Option<String>,
    /// Base64 Ed25519 verifying keys of accepted submitters.
    pub broadcasters: Vec<String>,
    pub storage: StorageConfig,
    /// Path to the ffmpeg binary.
    pub ffmpeg: PathBuf,
    /// Base64 Ed25519 signing key for result signatures.
    pub signing_key: Option<String>,
    /// Tracing filter directive.
    pub log: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8935".to_string(),
            max_segment_bytes: 64 * 1024 * 1024, // 64 MiB
            price_per_segment: 0,
            recipient: None,
            broadcasters: Vec::new(),
            storage: StorageConfig::Memory,
            ffmpeg: PathBuf::from("ffmpeg"),
            signing_key: None,
            log: "info".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parsed `recipient`, if set.
    pub fn recipient_address(&self) -> Result<Option<Address>, ConfigError> {
        self.recipient
            .as_deref()
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| ConfigError::InvalidAddress(e.to_string()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = WorkerConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.recipient_address().unwrap(), None);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            listen = "0.0.0.0:9000"
            max_segment_bytes = 1024
            price_per_segment = 25
            recipient = "0x00000000000000000000000000000000000000aa"
            broadcasters = ["key-a", "key-b"]
            ffmpeg = "/usr/local/bin/ffmpeg"
            log = "seg_worker=debug"

            [storage]
            backend = "fs"
            root = "/var/lib/seg-worker"
        "#;
        let config = WorkerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.max_segment_bytes, 1024);
        assert_eq!(config.price_per_segment, 25);
        assert_eq!(config.broadcasters.len(), 2);
        assert_eq!(
            config.storage,
            StorageConfig::Fs { root: PathBuf::from("/var/lib/seg-worker") }
        );
        let mut expected = [0u8; 20];
        expected[19] = 0xaa;
        assert_eq!(config.recipient_address().unwrap(), Some(Address(expected)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            WorkerConfig::from_toml_str("listen_addr = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_recipient() {
        let config = WorkerConfig {
            recipient: Some("0x1234".to_string()),
            ..WorkerConfig::default()
        };
        assert!(matches!(
            config.recipient_address(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = WorkerConfig::load(Path::new("/nonexistent/seg-worker.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
