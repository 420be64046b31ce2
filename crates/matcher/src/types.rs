use corpus::CorpusError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which phase produced a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Perceptual-hash lookup through the LSH index.
    Hash,
    /// Keypoint matching with geometric verification.
    Feature,
}

/// A single identified cover, transient per query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCandidate {
    /// Public cover identifier (the catalog image stem).
    pub cover_id: String,
    /// Hash path: percentage derived from Hamming distance. Feature path:
    /// the geometric verification score. Comparable within one method only.
    pub confidence: f32,
    pub method: MatchMethod,
}

/// Per-request options, the caller-facing surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchOptions {
    /// Maximum Hamming distance (of 256 bits) for a hash match.
    #[serde(default = "MatchOptions::default_hash_threshold")]
    pub hash_threshold: u32,
    /// Return a ranked list instead of only the best match.
    #[serde(default)]
    pub return_multiple: bool,
    /// Cap on the ranked list in multi-result mode.
    #[serde(default = "MatchOptions::default_max_results")]
    pub max_results: usize,
}

impl MatchOptions {
    pub(crate) fn default_hash_threshold() -> u32 {
        15
    }

    pub(crate) fn default_max_results() -> usize {
        3
    }

    pub fn with_hash_threshold(mut self, threshold: u32) -> Self {
        self.hash_threshold = threshold;
        self
    }

    pub fn with_multiple(mut self, max_results: usize) -> Self {
        self.return_multiple = true;
        self.max_results = max_results;
        self
    }

    /// Validate the options for a single request.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.hash_threshold == 0 || self.hash_threshold as usize > perceptual::HASH_BITS {
            return Err(MatchError::InvalidOptions(format!(
                "hash_threshold must be in 1..={}, got {}",
                perceptual::HASH_BITS,
                self.hash_threshold
            )));
        }
        if self.max_results == 0 {
            return Err(MatchError::InvalidOptions(
                "max_results must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            hash_threshold: Self::default_hash_threshold(),
            return_multiple: false,
            max_results: Self::default_max_results(),
        }
    }
}

/// Errors produced by the matching layer.
///
/// "No match" is never an error: both phases exhausting without a hit
/// returns an empty result list. Only invalid requests and genuine corpus
/// faults land here.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Invalid per-request options or engine configuration.
    #[error("invalid match options: {0}")]
    InvalidOptions(String),
    /// Corpus loading failed.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}
