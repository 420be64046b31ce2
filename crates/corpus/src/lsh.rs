//! Banded LSH index over 256-bit cover hashes.
//!
//! Each hash is sliced into [`BANDS`] contiguous 8-bit bands; a cover is
//! inserted into the bucket keyed by `(band_index, band_value)` for every
//! band. Many short bands favor recall over bucket selectivity: two hashes
//! within the matching radius almost surely agree on at least one whole band,
//! and the exact Hamming check downstream culls the false positives cheaply.
//!
//! Buckets hold integer corpus indices in a flat table for cache locality;
//! string cover ids appear only at the public boundary.

use perceptual::{CoverHash, HASH_BITS};
use serde::{Deserialize, Serialize};

/// Number of 8-bit bands per hash.
pub const BANDS: usize = HASH_BITS / 8;

const BUCKETS: usize = BANDS * 256;

/// The derived bucket index. Rebuilt wholesale from the record set on every
/// corpus load; never patched incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LshIndex {
    buckets: Vec<Vec<u32>>,
}

impl LshIndex {
    /// Build the index from `(corpus_index, hash)` pairs.
    pub fn build(hashes: impl IntoIterator<Item = (u32, CoverHash)>) -> Self {
        let mut buckets = vec![Vec::new(); BUCKETS];
        for (index, hash) in hashes {
            for band in 0..BANDS {
                buckets[Self::bucket_of(band, hash.band(band))].push(index);
            }
        }
        Self { buckets }
    }

    #[inline]
    fn bucket_of(band: usize, value: u8) -> usize {
        band * 256 + value as usize
    }

    /// Union of all covers sharing at least one band with `hash`, sorted and
    /// deduplicated. By construction this is a superset of every cover within
    /// the designed Hamming radius.
    pub fn candidates(&self, hash: &CoverHash) -> Vec<u32> {
        let mut out = Vec::new();
        for band in 0..BANDS {
            out.extend_from_slice(&self.buckets[Self::bucket_of(band, hash.band(band))]);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Total bucket entries; every indexed cover contributes exactly
    /// [`BANDS`] of them.
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

impl Default for LshIndex {
    fn default() -> Self {
        Self::build(std::iter::empty())
    }
}
