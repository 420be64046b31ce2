use thiserror::Error;

/// Errors produced by corpus loading.
///
/// Deliberately small: a missing or empty corpus directory is absorbed into
/// an empty index, and a file that fails to decode is skipped and logged.
/// Only genuine I/O faults and invalid configuration surface here.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Invalid corpus configuration.
    #[error("invalid corpus config: {0}")]
    InvalidConfig(String),
    /// Reading the corpus directory failed for a reason other than absence.
    #[error("corpus directory unreadable: {0}")]
    Io(#[from] std::io::Error),
}

impl From<perceptual::PerceptualError> for CorpusError {
    fn from(err: perceptual::PerceptualError) -> Self {
        CorpusError::InvalidConfig(err.to_string())
    }
}

impl From<features::FeatureError> for CorpusError {
    fn from(err: features::FeatureError) -> Self {
        CorpusError::InvalidConfig(err.to_string())
    }
}
