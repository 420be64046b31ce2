//! Separable 2-D DCT-II over a square sample grid.
//!
//! The grid is small (32×32 by default) so the direct O(n³) separable form is
//! faster in practice than pulling in an FFT, and it is exactly
//! reproducible across platforms.

use std::f64::consts::PI;

/// Cosine basis table for a 1-D DCT-II of length `n`, row-major `[k][i]`.
fn basis(n: usize) -> Vec<f64> {
    let mut table = vec![0.0f64; n * n];
    for k in 0..n {
        for i in 0..n {
            table[k * n + i] = ((PI / n as f64) * (i as f64 + 0.5) * k as f64).cos();
        }
    }
    table
}

/// Compute the 2-D DCT-II of `samples` (row-major, `n × n`).
///
/// Orthonormal scaling is omitted: the caller thresholds coefficients against
/// their own median, so a uniform per-row scale has no effect on the result.
pub(crate) fn dct2_2d(samples: &[f64], n: usize) -> Vec<f64> {
    debug_assert_eq!(samples.len(), n * n);
    let table = basis(n);

    // Rows first.
    let mut rows = vec![0.0f64; n * n];
    for y in 0..n {
        let row = &samples[y * n..(y + 1) * n];
        for k in 0..n {
            let mut acc = 0.0;
            for (i, &s) in row.iter().enumerate() {
                acc += s * table[k * n + i];
            }
            rows[y * n + k] = acc;
        }
    }

    // Then columns.
    let mut out = vec![0.0f64; n * n];
    for x in 0..n {
        for k in 0..n {
            let mut acc = 0.0;
            for y in 0..n {
                acc += rows[y * n + x] * table[k * n + y];
            }
            out[k * n + x] = acc;
        }
    }
    out
}
