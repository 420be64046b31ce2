use serde::{Deserialize, Serialize};

use crate::FeatureError;

/// Configuration for keypoint detection and descriptor extraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureConfig {
    /// Hard cap on extracted keypoints; the strongest responses win.
    #[serde(default = "FeatureConfig::default_max_keypoints")]
    pub max_keypoints: usize,
    /// Number of scale-space octaves. Octaves past the point where the image
    /// drops below 16 px are skipped regardless.
    #[serde(default = "FeatureConfig::default_octaves")]
    pub octaves: usize,
    /// Sampled scales per octave.
    #[serde(default = "FeatureConfig::default_scales_per_octave")]
    pub scales_per_octave: usize,
    /// Base blur of the first scale in each octave.
    #[serde(default = "FeatureConfig::default_sigma")]
    pub sigma: f32,
    /// Minimum absolute difference-of-Gaussians response for a candidate
    /// extremum (on a 0..1 intensity range).
    #[serde(default = "FeatureConfig::default_contrast_threshold")]
    pub contrast_threshold: f32,
    /// Maximum principal-curvature ratio before an extremum is discarded as
    /// an edge response.
    #[serde(default = "FeatureConfig::default_edge_threshold")]
    pub edge_threshold: f32,
}

impl FeatureConfig {
    pub(crate) fn default_max_keypoints() -> usize {
        1500
    }

    pub(crate) fn default_octaves() -> usize {
        4
    }

    pub(crate) fn default_scales_per_octave() -> usize {
        3
    }

    pub(crate) fn default_sigma() -> f32 {
        1.6
    }

    pub(crate) fn default_contrast_threshold() -> f32 {
        0.02
    }

    pub(crate) fn default_edge_threshold() -> f32 {
        10.0
    }

    pub fn with_max_keypoints(mut self, max: usize) -> Self {
        self.max_keypoints = max;
        self
    }

    pub fn with_contrast_threshold(mut self, threshold: f32) -> Self {
        self.contrast_threshold = threshold;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.max_keypoints == 0 {
            return Err(FeatureError::InvalidConfig(
                "max_keypoints must be greater than zero".into(),
            ));
        }
        if self.octaves == 0 {
            return Err(FeatureError::InvalidConfig(
                "octaves must be greater than zero".into(),
            ));
        }
        if self.scales_per_octave == 0 {
            return Err(FeatureError::InvalidConfig(
                "scales_per_octave must be greater than zero".into(),
            ));
        }
        if !(self.sigma > 0.0) {
            return Err(FeatureError::InvalidConfig("sigma must be positive".into()));
        }
        if !(self.contrast_threshold > 0.0) {
            return Err(FeatureError::InvalidConfig(
                "contrast_threshold must be positive".into(),
            ));
        }
        if !(self.edge_threshold >= 1.0) {
            return Err(FeatureError::InvalidConfig(
                "edge_threshold must be >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_keypoints: Self::default_max_keypoints(),
            octaves: Self::default_octaves(),
            scales_per_octave: Self::default_scales_per_octave(),
            sigma: Self::default_sigma(),
            contrast_threshold: Self::default_contrast_threshold(),
            edge_threshold: Self::default_edge_threshold(),
        }
    }
}
