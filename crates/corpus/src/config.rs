use features::FeatureConfig;
use perceptual::HashConfig;
use serde::{Deserialize, Serialize};

use crate::CorpusError;

/// Configuration for corpus ingestion.
///
/// The hash and feature sections here are the single source of truth for how
/// fingerprints are computed; the matching engine reads them back from the
/// built index so queries are always fingerprinted the same way the corpus
/// was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusConfig {
    /// Perceptual hash parameters.
    #[serde(default)]
    pub hash: HashConfig,
    /// Keypoint/descriptor extraction parameters.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Capacity of the decoded-art LRU cache.
    #[serde(default = "CorpusConfig::default_art_cache_capacity")]
    pub art_cache_capacity: usize,
}

impl CorpusConfig {
    pub(crate) fn default_art_cache_capacity() -> usize {
        64
    }

    pub fn with_hash(mut self, hash: HashConfig) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_art_cache_capacity(mut self, capacity: usize) -> Self {
        self.art_cache_capacity = capacity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CorpusError> {
        self.hash.validate()?;
        self.features.validate()?;
        Ok(())
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            hash: HashConfig::default(),
            features: FeatureConfig::default(),
            art_cache_capacity: Self::default_art_cache_capacity(),
        }
    }
}
