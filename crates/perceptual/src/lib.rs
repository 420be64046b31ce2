//! Perceptual hashing for cover-art identification.
//!
//! This crate produces the 256-bit pHash signature used by the fast matching
//! path. The hash is derived from the low-frequency block of a 2-D DCT over a
//! downscaled grayscale rendition of the image, thresholded against the
//! median coefficient. Visually similar images (re-encodes, resizes, mild
//! noise) land within a small Hamming distance of each other; the hash is
//! deliberately **not** rotation-invariant.

pub mod config;
mod dct;
pub mod fingerprint;

pub use config::{HashConfig, PerceptualError};
pub use fingerprint::{CoverHash, HASH_BITS, HASH_GRID};

use image::imageops::{self, FilterType};
use image::DynamicImage;

/// Compute the 256-bit perceptual hash of an image.
///
/// The input is converted to grayscale, resized to `cfg.dct_size` squared,
/// transformed with a 2-D DCT-II, and the `HASH_GRID × HASH_GRID`
/// low-frequency block is thresholded against its median coefficient. The
/// median split keeps the bit population balanced regardless of global
/// brightness or contrast.
pub fn hash_image(img: &DynamicImage, cfg: &HashConfig) -> CoverHash {
    let n = cfg.dct_size;
    let gray = imageops::resize(&img.to_luma8(), n as u32, n as u32, FilterType::Triangle);

    let mut samples = vec![0.0f64; n * n];
    for y in 0..n {
        for x in 0..n {
            samples[y * n + x] = f64::from(gray.get_pixel(x as u32, y as u32)[0]);
        }
    }

    let spectrum = dct::dct2_2d(&samples, n);

    // Low-frequency block, row-major. The DC term participates in the median
    // like every other coefficient; the median split neutralizes its weight.
    let mut coeffs = [0.0f64; HASH_BITS];
    for v in 0..HASH_GRID {
        for u in 0..HASH_GRID {
            coeffs[v * HASH_GRID + u] = spectrum[v * n + u];
        }
    }

    let mut sorted = coeffs;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = (sorted[HASH_BITS / 2 - 1] + sorted[HASH_BITS / 2]) / 2.0;

    let mut hash = CoverHash::default();
    for (bit, &c) in coeffs.iter().enumerate() {
        if c > median {
            hash.set(bit);
        }
    }
    hash
}
