//! Robust matching path: descriptor correspondence plus RANSAC verification.
//!
//! Invoked only when the hash phase comes up empty. Every corpus cover with
//! cached descriptors is evaluated (there is no shortcut index in descriptor
//! space), so this phase costs O(corpus × descriptors) and is parallelized
//! per candidate.

use corpus::CoverCorpusIndex;
use features::{
    ransac_homography, Correspondence, DescriptorIndex, FeatureSet, KnnConfig, RansacConfig,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{MatchCandidate, MatchMethod, MatchOptions};

/// Configuration for the feature phase.
///
/// The ratio (0.65) and reprojection (3.0 px) defaults are empirically
/// chosen: stricter than the conventional 0.7 / 5.0 because the hash path
/// already captures most true positives, so this path trades recall for
/// precision. Do not retune them without a labeled validation set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureMatchConfig {
    /// Minimum query keypoints before the phase runs at all.
    #[serde(default = "FeatureMatchConfig::default_min_keypoints")]
    pub min_keypoints: usize,
    /// Lowe ratio: a correspondence survives only if the nearest neighbor is
    /// closer than `ratio ×` the second nearest.
    #[serde(default = "FeatureMatchConfig::default_ratio")]
    pub ratio: f32,
    /// Minimum ratio-surviving correspondences before geometry is attempted.
    #[serde(default = "FeatureMatchConfig::default_min_ratio_matches")]
    pub min_ratio_matches: usize,
    /// Minimum RANSAC inliers for a candidate to count.
    #[serde(default = "FeatureMatchConfig::default_min_geometric_matches")]
    pub min_geometric_matches: usize,
    /// Minimum inlier fraction of the ratio survivors. Both this relative
    /// bar and the absolute inlier bar are required: a handful of matches
    /// can be perfectly consistent by chance, and a large count can still be
    /// mostly noise.
    #[serde(default = "FeatureMatchConfig::default_min_match_quality")]
    pub min_match_quality: f32,
    /// Multi-result mode keeps candidates scoring at least this fraction of
    /// the best score.
    #[serde(default = "FeatureMatchConfig::default_keep_fraction")]
    pub keep_fraction: f32,
    /// Descriptor k-NN backend parameters.
    #[serde(default)]
    pub knn: KnnConfig,
    /// Geometric verification parameters.
    #[serde(default)]
    pub ransac: RansacConfig,
}

impl FeatureMatchConfig {
    pub(crate) fn default_min_keypoints() -> usize {
        15
    }

    pub(crate) fn default_ratio() -> f32 {
        0.65
    }

    pub(crate) fn default_min_ratio_matches() -> usize {
        8
    }

    pub(crate) fn default_min_geometric_matches() -> usize {
        8
    }

    pub(crate) fn default_min_match_quality() -> f32 {
        0.75
    }

    pub(crate) fn default_keep_fraction() -> f32 {
        0.7
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_keypoints == 0 {
            return Err("min_keypoints must be greater than zero".into());
        }
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err("ratio must be in (0.0, 1.0)".into());
        }
        if self.min_ratio_matches < 4 {
            return Err("min_ratio_matches must be at least 4 (homography minimum)".into());
        }
        if !(self.min_match_quality > 0.0 && self.min_match_quality <= 1.0) {
            return Err("min_match_quality must be in (0.0, 1.0]".into());
        }
        if !(self.keep_fraction > 0.0 && self.keep_fraction <= 1.0) {
            return Err("keep_fraction must be in (0.0, 1.0]".into());
        }
        Ok(())
    }
}

impl Default for FeatureMatchConfig {
    fn default() -> Self {
        Self {
            min_keypoints: Self::default_min_keypoints(),
            ratio: Self::default_ratio(),
            min_ratio_matches: Self::default_min_ratio_matches(),
            min_geometric_matches: Self::default_min_geometric_matches(),
            min_match_quality: Self::default_min_match_quality(),
            keep_fraction: Self::default_keep_fraction(),
            knn: KnnConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

pub(crate) struct FeatureMatcher<'a> {
    corpus: &'a CoverCorpusIndex,
    cfg: &'a FeatureMatchConfig,
}

impl<'a> FeatureMatcher<'a> {
    pub fn new(corpus: &'a CoverCorpusIndex, cfg: &'a FeatureMatchConfig) -> Self {
        Self { corpus, cfg }
    }

    pub fn run(&self, query: &FeatureSet, opts: &MatchOptions) -> Vec<MatchCandidate> {
        if query.len() < self.cfg.min_keypoints {
            // Insufficient signal is an expected outcome, not an error.
            debug!(
                keypoints = query.len(),
                minimum = self.cfg.min_keypoints,
                "query too plain for feature matching"
            );
            return Vec::new();
        }

        // One ANN index over the query's descriptors serves every candidate;
        // each cover's descriptors are probed against it.
        let index = DescriptorIndex::build(&query.descriptors, self.cfg.knn);

        let mut scored: Vec<(u32, f64)> = self
            .corpus
            .records()
            .par_iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let features = record.features.as_ref()?;
                score_candidate(features, query, &index, self.cfg).map(|s| (i as u32, s))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        debug!(candidates = scored.len(), "feature phase scored candidates");

        if scored.is_empty() {
            return Vec::new();
        }

        if opts.return_multiple {
            retain_comparable(&mut scored, f64::from(self.cfg.keep_fraction));
            scored.truncate(opts.max_results);
        } else {
            scored.truncate(1);
        }

        scored
            .into_iter()
            .map(|(index, score)| MatchCandidate {
                cover_id: self.corpus.record(index).cover_id.clone(),
                confidence: score as f32,
                method: MatchMethod::Feature,
            })
            .collect()
    }
}

/// Score one cover against the query, or `None` if it fails any gate.
fn score_candidate(
    cover: &FeatureSet,
    query: &FeatureSet,
    query_index: &DescriptorIndex,
    cfg: &FeatureMatchConfig,
) -> Option<f64> {
    let pairs = ratio_matches(cover, query, query_index, cfg.ratio);
    if pairs.len() < cfg.min_ratio_matches {
        return None;
    }

    let fit = ransac_homography(&pairs, &cfg.ransac)?;
    let geometric = fit.inliers.len();
    let quality = geometric as f64 / pairs.len() as f64;
    if quality < f64::from(cfg.min_match_quality) || geometric < cfg.min_geometric_matches {
        return None;
    }

    // Squared quality makes reliability dominate; the linear terms reward
    // more and broader evidence without overriding it.
    let coverage = geometric as f64 / cover.len() as f64;
    Some(quality * quality * geometric as f64 * (1.0 + coverage))
}

/// Ratio-test correspondences, cover keypoints onto query keypoints.
fn ratio_matches(
    cover: &FeatureSet,
    query: &FeatureSet,
    query_index: &DescriptorIndex,
    ratio: f32,
) -> Vec<Correspondence> {
    let mut pairs = Vec::new();
    for (ci, descriptor) in cover.descriptors.iter().enumerate() {
        let Some([nearest, second]) = query_index.two_nearest(descriptor) else {
            continue;
        };
        if nearest.distance < ratio * second.distance {
            let from = &cover.keypoints[ci];
            let to = &query.keypoints[nearest.index];
            pairs.push(Correspondence {
                from: [f64::from(from.x), f64::from(from.y)],
                to: [f64::from(to.x), f64::from(to.y)],
            });
        }
    }
    pairs
}

/// Keep only entries scoring at least `keep_fraction` of the best. Assumes
/// `scored` is sorted descending.
pub(crate) fn retain_comparable(scored: &mut Vec<(u32, f64)>, keep_fraction: f64) {
    let Some(&(_, best)) = scored.first() else {
        return;
    };
    let cutoff = keep_fraction * best;
    scored.retain(|&(_, score)| score >= cutoff);
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus::{CorpusConfig, CoverRecord};
    use features::KeyPoint;

    fn synthetic_set(count: usize, offset: f32) -> FeatureSet {
        // Descriptors on distinct axes so nearest-neighbor structure is
        // unambiguous; keypoints on a grid shifted by `offset`.
        let mut set = FeatureSet::default();
        for i in 0..count {
            let mut descriptor = vec![0.0f32; 32];
            descriptor[i % 32] = 1.0 + (i / 32) as f32;
            set.descriptors.push(descriptor);
            set.keypoints.push(KeyPoint {
                x: (i % 8) as f32 * 10.0 + offset,
                y: (i / 8) as f32 * 10.0 + offset,
                scale: 2.0,
                orientation: 0.0,
                response: 1.0,
            });
        }
        set
    }

    #[test]
    fn plain_query_short_circuits() {
        let corpus = CoverCorpusIndex::from_records(Vec::new(), CorpusConfig::default());
        let cfg = FeatureMatchConfig::default();
        let matcher = FeatureMatcher::new(&corpus, &cfg);
        let query = synthetic_set(5, 0.0);
        assert!(matcher.run(&query, &MatchOptions::default()).is_empty());
    }

    #[test]
    fn identical_feature_sets_match_with_translation() {
        let cover_set = synthetic_set(24, 0.0);
        let query = synthetic_set(24, 6.0);
        let record = CoverRecord {
            cover_id: "shifted".into(),
            path: None,
            hash: None,
            features: Some(cover_set),
        };
        let corpus = CoverCorpusIndex::from_records(vec![record], CorpusConfig::default());
        let cfg = FeatureMatchConfig::default();
        let matcher = FeatureMatcher::new(&corpus, &cfg);

        let out = matcher.run(&query, &MatchOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cover_id, "shifted");
        assert_eq!(out[0].method, MatchMethod::Feature);
        assert!(out[0].confidence > 0.0);
    }

    #[test]
    fn covers_without_features_are_skipped() {
        let record = CoverRecord {
            cover_id: "hash-only".into(),
            path: None,
            hash: None,
            features: None,
        };
        let corpus = CoverCorpusIndex::from_records(vec![record], CorpusConfig::default());
        let cfg = FeatureMatchConfig::default();
        let matcher = FeatureMatcher::new(&corpus, &cfg);
        let query = synthetic_set(24, 0.0);
        assert!(matcher.run(&query, &MatchOptions::default()).is_empty());
    }

    #[test]
    fn comparable_filter_keeps_exactly_the_top_band() {
        let mut scored = vec![(0u32, 100.0), (1, 98.0), (2, 60.0), (3, 10.0)];
        retain_comparable(&mut scored, 0.7);
        assert_eq!(
            scored.iter().map(|&(i, _)| i).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn comparable_filter_handles_empty_input() {
        let mut scored: Vec<(u32, f64)> = Vec::new();
        retain_comparable(&mut scored, 0.7);
        assert!(scored.is_empty());
    }

    #[test]
    fn config_gates_are_validated() {
        let mut cfg = FeatureMatchConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.ratio = 1.2;
        assert!(cfg.validate().is_err());
        cfg = FeatureMatchConfig::default();
        cfg.min_ratio_matches = 2;
        assert!(cfg.validate().is_err());
    }
}
