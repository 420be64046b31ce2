use std::path::PathBuf;

use features::FeatureSet;
use perceptual::CoverHash;
use serde::{Deserialize, Serialize};

/// Fingerprints for one catalog cover, built once at corpus load and
/// immutable afterward.
///
/// Either fingerprint may be absent: a decode failure leaves a gap, and a
/// texture-free image yields no usable keypoints. Matchers skip absent
/// fingerprints rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverRecord {
    /// Catalog identifier: the image file stem.
    pub cover_id: String,
    /// Source file the record was built from, when loaded from disk.
    pub path: Option<PathBuf>,
    /// 256-bit perceptual hash.
    pub hash: Option<CoverHash>,
    /// Keypoints and descriptors; `None` when extraction found nothing.
    pub features: Option<FeatureSet>,
}

impl CoverRecord {
    /// Number of keypoints cached for this cover.
    pub fn keypoint_count(&self) -> usize {
        self.features.as_ref().map_or(0, FeatureSet::len)
    }
}
