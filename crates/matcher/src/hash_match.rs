//! Fast matching path: LSH candidate lookup plus exact Hamming verification.

use corpus::CoverCorpusIndex;
use perceptual::CoverHash;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{MatchCandidate, MatchMethod, MatchOptions};

/// Configuration for the hash phase. The distance threshold itself is a
/// per-request option ([`MatchOptions::hash_threshold`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashMatchConfig {
    /// In multi-result mode, matches farther than `best + comparable_window`
    /// Hamming from the best hit are long-tail noise and dropped.
    #[serde(default = "HashMatchConfig::default_comparable_window")]
    pub comparable_window: u32,
}

impl HashMatchConfig {
    pub(crate) fn default_comparable_window() -> u32 {
        3
    }
}

impl Default for HashMatchConfig {
    fn default() -> Self {
        Self {
            comparable_window: Self::default_comparable_window(),
        }
    }
}

pub(crate) struct HashMatcher<'a> {
    corpus: &'a CoverCorpusIndex,
    cfg: &'a HashMatchConfig,
}

impl<'a> HashMatcher<'a> {
    pub fn new(corpus: &'a CoverCorpusIndex, cfg: &'a HashMatchConfig) -> Self {
        Self { corpus, cfg }
    }

    /// Verified hits `(corpus_index, hamming_distance)`, ascending by
    /// distance. Covers without a stored hash are skipped, not failed.
    pub fn hits(&self, query: &CoverHash, threshold: u32) -> Vec<(u32, u32)> {
        let candidates = self.corpus.candidates_for(query);
        let mut hits: Vec<(u32, u32)> = candidates
            .into_iter()
            .filter_map(|index| {
                let record = self.corpus.record(index);
                let hash = record.hash.as_ref()?;
                let distance = hash.hamming(query);
                (distance <= threshold).then_some((index, distance))
            })
            .collect();
        hits.sort_by_key(|&(index, distance)| (distance, index));
        hits
    }

    pub fn run(&self, query: &CoverHash, opts: &MatchOptions) -> Vec<MatchCandidate> {
        let mut hits = self.hits(query, opts.hash_threshold);
        debug!(hits = hits.len(), "hash phase verified candidates");
        let Some(&(_, best)) = hits.first() else {
            return Vec::new();
        };

        if opts.return_multiple {
            hits.retain(|&(_, distance)| distance <= best + self.cfg.comparable_window);
            hits.truncate(opts.max_results);
        } else {
            hits.truncate(1);
        }

        hits.into_iter()
            .map(|(index, distance)| MatchCandidate {
                cover_id: self.corpus.record(index).cover_id.clone(),
                confidence: confidence(distance, opts.hash_threshold),
                method: MatchMethod::Hash,
            })
            .collect()
    }
}

/// Map a Hamming distance to a confidence percentage. Distance 0 is 100%;
/// the threshold itself maps to 50%.
fn confidence(distance: u32, threshold: u32) -> f32 {
    100.0 * (1.0 - distance as f32 / (2.0 * threshold as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus::{CorpusConfig, CoverRecord};

    fn hash_with_bits(bits: &[usize]) -> CoverHash {
        let mut h = CoverHash::default();
        for &b in bits {
            h.set(b);
        }
        h
    }

    fn record(id: &str, hash: CoverHash) -> CoverRecord {
        CoverRecord {
            cover_id: id.to_string(),
            path: None,
            hash: Some(hash),
            features: None,
        }
    }

    fn corpus_with(records: Vec<CoverRecord>) -> CoverCorpusIndex {
        CoverCorpusIndex::from_records(records, CorpusConfig::default())
    }

    #[test]
    fn exact_hash_match_has_distance_zero_and_full_confidence() {
        let target = hash_with_bits(&[1, 50, 120, 200]);
        let corpus = corpus_with(vec![
            record("a", hash_with_bits(&[3, 80])),
            record("b", target),
        ]);
        let cfg = HashMatchConfig::default();
        let matcher = HashMatcher::new(&corpus, &cfg);

        let hits = matcher.hits(&target, 15);
        assert_eq!(hits.first(), Some(&(1, 0)));

        let out = matcher.run(&target, &MatchOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cover_id, "b");
        assert_eq!(out[0].method, MatchMethod::Hash);
        assert!((out[0].confidence - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn hits_beyond_threshold_are_dropped() {
        let base = hash_with_bits(&[0, 8, 16, 24]);
        let mut far = base;
        for bit in 100..130 {
            far.flip(bit);
        }
        let corpus = corpus_with(vec![record("far", far)]);
        let cfg = HashMatchConfig::default();
        let matcher = HashMatcher::new(&corpus, &cfg);
        assert!(matcher.run(&base, &MatchOptions::default()).is_empty());
    }

    #[test]
    fn records_without_hash_are_skipped() {
        let target = hash_with_bits(&[5]);
        let mut gap = record("gap", target);
        gap.hash = None;
        let corpus = corpus_with(vec![gap, record("ok", target)]);
        let cfg = HashMatchConfig::default();
        let matcher = HashMatcher::new(&corpus, &cfg);

        let out = matcher.run(&target, &MatchOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cover_id, "ok");
    }

    #[test]
    fn multi_result_keeps_only_comparable_distances() {
        let base = hash_with_bits(&[0, 64, 128, 192]);
        let mut near = base;
        near.flip(10);
        near.flip(11);
        let mut comparable = base;
        for bit in 20..23 {
            comparable.flip(bit);
        }
        let mut tail = base;
        for bit in 30..44 {
            tail.flip(bit);
        }
        let corpus = corpus_with(vec![
            record("near", near),
            record("comparable", comparable),
            record("tail", tail),
        ]);
        let cfg = HashMatchConfig::default();
        let matcher = HashMatcher::new(&corpus, &cfg);

        // near = 2 bits, comparable = 3 bits, tail = 14 bits. The window
        // (best + 3) admits the first two only.
        let opts = MatchOptions::default().with_multiple(3);
        let out = matcher.run(&base, &opts);
        assert_eq!(
            out.iter().map(|c| c.cover_id.as_str()).collect::<Vec<_>>(),
            vec!["near", "comparable"]
        );
        assert!(out[0].confidence > out[1].confidence);
    }

    #[test]
    fn single_result_mode_returns_best_only() {
        let base = hash_with_bits(&[7, 70]);
        let mut other = base;
        other.flip(200);
        let corpus = corpus_with(vec![record("best", base), record("other", other)]);
        let cfg = HashMatchConfig::default();
        let matcher = HashMatcher::new(&corpus, &cfg);
        let out = matcher.run(&base, &MatchOptions::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].cover_id, "best");
    }

    #[test]
    fn confidence_maps_threshold_to_half() {
        assert!((confidence(0, 15) - 100.0).abs() < f32::EPSILON);
        assert!((confidence(15, 15) - 50.0).abs() < f32::EPSILON);
    }
}
