//! Homography estimation and RANSAC geometric verification.
//!
//! A planar cover photographed at an angle maps onto the reference art by a
//! homography; correspondences that survive a RANSAC fit of that model are
//! spatially consistent, not coincidental.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A single point correspondence, reference (`from`) onto query (`to`),
/// in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

/// Configuration for RANSAC homography fitting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RansacConfig {
    /// Number of minimal-sample iterations.
    #[serde(default = "RansacConfig::default_iterations")]
    pub iterations: usize,
    /// Maximum reprojection error in pixels for a correspondence to count as
    /// an inlier. Empirically chosen; see the matcher-level docs before
    /// changing it.
    #[serde(default = "RansacConfig::default_reproj_threshold")]
    pub reproj_threshold: f64,
    /// Seed for the sampling RNG; fitting is fully deterministic for a given
    /// seed and input.
    #[serde(default = "RansacConfig::default_seed")]
    pub seed: u64,
}

impl RansacConfig {
    pub(crate) fn default_iterations() -> usize {
        512
    }

    pub(crate) fn default_reproj_threshold() -> f64 {
        3.0
    }

    pub(crate) fn default_seed() -> u64 {
        0x5EED_C0DE
    }
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            iterations: Self::default_iterations(),
            reproj_threshold: Self::default_reproj_threshold(),
            seed: Self::default_seed(),
        }
    }
}

/// Result of a successful RANSAC fit.
#[derive(Debug, Clone)]
pub struct HomographyFit {
    /// Row-major 3×3 homography mapping `from` points onto `to` points.
    pub h: [f64; 9],
    /// Indices into the input correspondence slice that fit the model.
    pub inliers: Vec<usize>,
}

/// Fit a homography to `pairs` with RANSAC.
///
/// Returns `None` when fewer than four correspondences are supplied or no
/// sample produces a model with at least four inliers.
pub fn ransac_homography(pairs: &[Correspondence], cfg: &RansacConfig) -> Option<HomographyFit> {
    if pairs.len() < 4 {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best_inliers: Vec<usize> = Vec::new();
    let mut best_h: Option<[f64; 9]> = None;

    for _ in 0..cfg.iterations {
        let sample = sample_four(&mut rng, pairs.len());
        let minimal: Vec<Correspondence> = sample.iter().map(|&i| pairs[i]).collect();
        let Some(h) = fit_homography(&minimal) else {
            continue;
        };
        let inliers = collect_inliers(pairs, &h, cfg.reproj_threshold);
        if inliers.len() > best_inliers.len() {
            best_inliers = inliers;
            best_h = Some(h);
        }
    }

    let h = best_h?;
    if best_inliers.len() < 4 {
        return None;
    }

    // Refit on the full inlier set; keep the refit only if it does not lose
    // support.
    let support: Vec<Correspondence> = best_inliers.iter().map(|&i| pairs[i]).collect();
    if let Some(refit) = fit_homography(&support) {
        let inliers = collect_inliers(pairs, &refit, cfg.reproj_threshold);
        if inliers.len() >= best_inliers.len() {
            return Some(HomographyFit { h: refit, inliers });
        }
    }
    Some(HomographyFit {
        h,
        inliers: best_inliers,
    })
}

/// Apply a homography to a point. `None` when the point maps to infinity.
pub fn project(h: &[f64; 9], p: [f64; 2]) -> Option<[f64; 2]> {
    let w = h[6] * p[0] + h[7] * p[1] + h[8];
    if w.abs() < 1e-12 {
        return None;
    }
    Some([
        (h[0] * p[0] + h[1] * p[1] + h[2]) / w,
        (h[3] * p[0] + h[4] * p[1] + h[5]) / w,
    ])
}

fn collect_inliers(pairs: &[Correspondence], h: &[f64; 9], threshold: f64) -> Vec<usize> {
    let mut inliers = Vec::new();
    for (i, pair) in pairs.iter().enumerate() {
        let Some(projected) = project(h, pair.from) else {
            continue;
        };
        let dx = projected[0] - pair.to[0];
        let dy = projected[1] - pair.to[1];
        if (dx * dx + dy * dy).sqrt() <= threshold {
            inliers.push(i);
        }
    }
    inliers
}

fn sample_four(rng: &mut StdRng, len: usize) -> [usize; 4] {
    let mut picked = [usize::MAX; 4];
    let mut count = 0;
    while count < 4 {
        let candidate = rng.random_range(0..len);
        if !picked[..count].contains(&candidate) {
            picked[count] = candidate;
            count += 1;
        }
    }
    picked
}

/// Least-squares homography via the normalized direct linear transform,
/// fixing `h[8] = 1`. Returns `None` for degenerate configurations.
fn fit_homography(pairs: &[Correspondence]) -> Option<[f64; 9]> {
    if pairs.len() < 4 {
        return None;
    }

    let (t_from, from_norm) = normalize(pairs.iter().map(|p| p.from));
    let (t_to, to_norm) = normalize(pairs.iter().map(|p| p.to));

    // Normal equations for the 8 unknowns of H with h9 fixed at 1.
    let mut ata = [[0.0f64; 8]; 8];
    let mut atb = [0.0f64; 8];
    for (f, t) in from_norm.iter().zip(to_norm.iter()) {
        let (x, y) = (f[0], f[1]);
        let (u, v) = (t[0], t[1]);
        let rows: [([f64; 8], f64); 2] = [
            ([x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y], u),
            ([0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y], v),
        ];
        for (row, rhs) in rows {
            for i in 0..8 {
                for j in 0..8 {
                    ata[i][j] += row[i] * row[j];
                }
                atb[i] += row[i] * rhs;
            }
        }
    }

    let solution = solve_8x8(ata, atb)?;
    let hn = [
        solution[0], solution[1], solution[2],
        solution[3], solution[4], solution[5],
        solution[6], solution[7], 1.0,
    ];

    // Denormalize: H = T_to⁻¹ · Hn · T_from.
    let h = mat3_mul(&mat3_mul(&invert_similarity(&t_to), &hn), &t_from);
    Some(h)
}

/// Gaussian elimination with partial pivoting on an 8×8 system.
fn solve_8x8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..8 {
            let factor = a[row][col] / a[col][col];
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut acc = b[row];
        for k in row + 1..8 {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

/// Hartley normalization: translate the centroid to the origin and scale the
/// mean distance to √2. Returns the similarity transform and the transformed
/// points.
fn normalize(points: impl Iterator<Item = [f64; 2]> + Clone) -> ([f64; 9], Vec<[f64; 2]>) {
    let collected: Vec<[f64; 2]> = points.collect();
    let n = collected.len() as f64;
    let cx = collected.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = collected.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = collected
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = [
        scale, 0.0, -scale * cx,
        0.0, scale, -scale * cy,
        0.0, 0.0, 1.0,
    ];
    let transformed = collected
        .iter()
        .map(|p| [scale * (p[0] - cx), scale * (p[1] - cy)])
        .collect();
    (t, transformed)
}

/// Invert a similarity transform of the shape produced by [`normalize`].
fn invert_similarity(t: &[f64; 9]) -> [f64; 9] {
    let s = t[0];
    [
        1.0 / s, 0.0, -t[2] / s,
        0.0, 1.0 / s, -t[5] / s,
        0.0, 0.0, 1.0,
    ]
}

fn mat3_mul(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut out = [0.0f64; 9];
    for row in 0..3 {
        for col in 0..3 {
            let mut acc = 0.0;
            for k in 0..3 {
                acc += a[row * 3 + k] * b[k * 3 + col];
            }
            out[row * 3 + col] = acc;
        }
    }
    out
}
