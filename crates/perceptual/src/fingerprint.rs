//! The 256-bit cover hash representation.
//!
//! The hash layout is part of the public contract between this crate and the
//! LSH index: bit `i` of the hash is bit `i % 64` of word `i / 64`, and the
//! banded index downstream slices the 256 bits into contiguous 8-bit bands.

use serde::{Deserialize, Serialize};

/// Side length of the low-frequency block retained from the DCT spectrum.
pub const HASH_GRID: usize = 16;

/// Total hash width in bits.
pub const HASH_BITS: usize = HASH_GRID * HASH_GRID;

/// A 256-bit perceptual hash, stored as four little-endian 64-bit words.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CoverHash(pub [u64; 4]);

impl CoverHash {
    /// Set bit `i` (0-based, `i < HASH_BITS`).
    #[inline]
    pub fn set(&mut self, i: usize) {
        debug_assert!(i < HASH_BITS);
        self.0[i / 64] |= 1u64 << (i % 64);
    }

    /// Read bit `i`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < HASH_BITS);
        (self.0[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Flip bit `i`.
    #[inline]
    pub fn flip(&mut self, i: usize) {
        debug_assert!(i < HASH_BITS);
        self.0[i / 64] ^= 1u64 << (i % 64);
    }

    /// Exact Hamming distance to another hash.
    #[inline]
    pub fn hamming(&self, other: &CoverHash) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    /// Byte `i` of the hash (`i < 32`), used as the LSH band value.
    #[inline]
    pub fn band(&self, i: usize) -> u8 {
        debug_assert!(i < HASH_BITS / 8);
        (self.0[i / 8] >> ((i % 8) * 8)) as u8
    }
}
