use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::HASH_GRID;

/// Configuration for perceptual hash computation.
///
/// Cheap to clone and serde-friendly so it can be embedded in higher-level
/// pipeline configs. The hash grid itself is fixed at
/// [`HASH_GRID`]`×`[`HASH_GRID`] (256 bits) because the banded LSH layout
/// downstream depends on that width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashConfig {
    /// Side length of the downscaled image fed to the DCT. Must be at least
    /// [`HASH_GRID`]; larger values keep more spectrum before the
    /// low-frequency block is cut.
    #[serde(default = "HashConfig::default_dct_size")]
    pub dct_size: usize,
}

impl HashConfig {
    pub(crate) fn default_dct_size() -> usize {
        32
    }

    pub fn with_dct_size(mut self, dct_size: usize) -> Self {
        self.dct_size = dct_size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.dct_size < HASH_GRID {
            return Err(PerceptualError::InvalidConfig(format!(
                "dct_size must be >= {HASH_GRID}, got {}",
                self.dct_size
            )));
        }
        Ok(())
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            dct_size: Self::default_dct_size(),
        }
    }
}

/// Errors produced by the perceptual hashing layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PerceptualError {
    /// Invalid hash configuration.
    #[error("invalid hash config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(HashConfig::default().validate().is_ok());
    }

    #[test]
    fn undersized_dct_rejected() {
        let cfg = HashConfig::default().with_dct_size(8);
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            PerceptualError::InvalidConfig(msg) => assert!(msg.contains("dct_size")),
        }
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = HashConfig::default().with_dct_size(64);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: HashConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
