use corpus::CorpusConfig;
use matcher::{MatchError, MatcherConfig};
use serde::{Deserialize, Serialize};

/// Aggregated configuration for the whole identification pipeline.
///
/// The corpus section governs how fingerprints are computed at load time;
/// the matcher section governs how queries are scored against them. Queries
/// are always fingerprinted with the parameters stored in the built index,
/// so a config change only takes effect on the next corpus load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
}

impl PipelineConfig {
    pub fn with_corpus(mut self, corpus: CorpusConfig) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    /// Validate both sections.
    pub fn validate(&self) -> Result<(), MatchError> {
        self.corpus.validate()?;
        self.matcher.validate()
    }
}
