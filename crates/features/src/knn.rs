//! Descriptor k-NN: HNSW for large sets, exact linear scan below a size
//! threshold.

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for descriptor nearest-neighbor search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnnConfig {
    /// Number of neighbors per HNSW node (higher = better recall, slower build).
    #[serde(default = "KnnConfig::default_m")]
    pub m: usize,
    /// Candidate-list size during construction.
    #[serde(default = "KnnConfig::default_ef_construction")]
    pub ef_construction: usize,
    /// Candidate-list size during search.
    #[serde(default = "KnnConfig::default_ef_search")]
    pub ef_search: usize,
    /// Minimum number of descriptors before HNSW is used; below this the
    /// exact linear scan wins on both accuracy and build cost.
    #[serde(default = "KnnConfig::default_min_vectors_for_ann")]
    pub min_vectors_for_ann: usize,
}

impl KnnConfig {
    pub(crate) fn default_m() -> usize {
        16
    }

    pub(crate) fn default_ef_construction() -> usize {
        200
    }

    pub(crate) fn default_ef_search() -> usize {
        64
    }

    pub(crate) fn default_min_vectors_for_ann() -> usize {
        1000
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            m: Self::default_m(),
            ef_construction: Self::default_ef_construction(),
            ef_search: Self::default_ef_search(),
            min_vectors_for_ann: Self::default_min_vectors_for_ann(),
        }
    }
}

/// A neighbor hit: descriptor index plus exact Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Read-only nearest-neighbor index over a set of descriptors.
///
/// Distances returned by [`DescriptorIndex::two_nearest`] are always exact
/// Euclidean values recomputed against the stored vectors, so the ratio test
/// downstream behaves identically on both backends.
pub struct DescriptorIndex {
    config: KnnConfig,
    vectors: Vec<Vec<f32>>,
    hnsw: Option<Hnsw<'static, f32, DistL2>>,
}

impl DescriptorIndex {
    /// Build an index over `descriptors`. The HNSW graph is only constructed
    /// when the set is large enough to pay for it.
    pub fn build(descriptors: &[Vec<f32>], config: KnnConfig) -> Self {
        let vectors: Vec<Vec<f32>> = descriptors.to_vec();
        let hnsw = if vectors.len() >= config.min_vectors_for_ann {
            let nb_elem = vectors.len();
            let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
            let graph = Hnsw::<f32, DistL2>::new(
                config.m,
                nb_elem,
                nb_layer,
                config.ef_construction,
                DistL2 {},
            );
            let data: Vec<(&Vec<f32>, usize)> =
                vectors.iter().enumerate().map(|(i, v)| (v, i)).collect();
            graph.parallel_insert(&data);
            Some(graph)
        } else {
            None
        };
        Self {
            config,
            vectors,
            hnsw,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The two nearest stored descriptors to `query`, nearest first.
    /// Returns `None` when fewer than two descriptors are stored.
    pub fn two_nearest(&self, query: &[f32]) -> Option<[Neighbor; 2]> {
        if self.vectors.len() < 2 {
            return None;
        }
        match &self.hnsw {
            Some(graph) => {
                let hits = graph.search(query, 2, self.config.ef_search);
                if hits.len() < 2 {
                    return self.linear_two_nearest(query);
                }
                let mut pair = [
                    self.exact_neighbor(hits[0].get_origin_id(), query),
                    self.exact_neighbor(hits[1].get_origin_id(), query),
                ];
                if pair[1].distance < pair[0].distance {
                    pair.swap(0, 1);
                }
                Some(pair)
            }
            None => self.linear_two_nearest(query),
        }
    }

    fn exact_neighbor(&self, index: usize, query: &[f32]) -> Neighbor {
        Neighbor {
            index,
            distance: l2(&self.vectors[index], query),
        }
    }

    fn linear_two_nearest(&self, query: &[f32]) -> Option<[Neighbor; 2]> {
        let mut best = Neighbor {
            index: 0,
            distance: f32::INFINITY,
        };
        let mut second = best;
        for (index, vector) in self.vectors.iter().enumerate() {
            let distance = l2(vector, query);
            if distance < best.distance {
                second = best;
                best = Neighbor { index, distance };
            } else if distance < second.distance {
                second = Neighbor { index, distance };
            }
        }
        Some([best, second])
    }
}

/// Euclidean distance between two equal-length vectors.
#[inline]
pub fn l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basis(dim: usize, axis: usize, scale: f32) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = scale;
        v
    }

    #[test]
    fn linear_path_finds_exact_two_nearest() {
        let descriptors = vec![
            basis(8, 0, 1.0),
            basis(8, 1, 1.0),
            basis(8, 0, 1.1),
            basis(8, 2, 5.0),
        ];
        let index = DescriptorIndex::build(&descriptors, KnnConfig::default());
        assert!(index.hnsw.is_none());

        let [first, second] = index.two_nearest(&basis(8, 0, 1.0)).unwrap();
        assert_eq!(first.index, 0);
        assert!(first.distance < 1e-6);
        assert_eq!(second.index, 2);
        assert!((second.distance - 0.1).abs() < 1e-5);
    }

    #[test]
    fn too_few_vectors_yield_none() {
        let index = DescriptorIndex::build(&[basis(4, 0, 1.0)], KnnConfig::default());
        assert!(index.two_nearest(&basis(4, 0, 1.0)).is_none());
    }

    #[test]
    fn ann_backend_engages_above_threshold() {
        let cfg = KnnConfig::default().with_min_vectors_for_ann(16);
        let mut descriptors = Vec::new();
        for i in 0..64 {
            let mut v = vec![0.0f32; 16];
            v[i % 16] = 1.0 + (i / 16) as f32;
            descriptors.push(v);
        }
        let index = DescriptorIndex::build(&descriptors, cfg);
        assert!(index.hnsw.is_some());

        let [first, _] = index.two_nearest(&descriptors[5]).unwrap();
        // Exact distance is recomputed even on the ANN path.
        assert!(first.distance < 1e-6);
        assert_eq!(first.index, 5);
    }

    #[test]
    fn l2_matches_hand_computation() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![1.0f32, 0.0, 3.0];
        assert!((l2(&a, &b) - 2.0).abs() < 1e-6);
    }
}
