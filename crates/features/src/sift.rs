//! Scale-space extremum detection and orientation assignment.

use std::f32::consts::PI;

use crate::config::FeatureConfig;
use crate::pyramid::{GrayF32, Octave, ScaleSpace};

const ORIENTATION_BINS: usize = 36;

/// Secondary orientation peaks at least this fraction of the dominant peak
/// spawn an additional keypoint.
const PEAK_RATIO: f32 = 0.8;

/// A detected extremum in octave coordinates, before description.
#[derive(Debug, Clone)]
pub(crate) struct Detection {
    pub octave: usize,
    /// Gaussian level whose blur matches the extremum.
    pub level: usize,
    pub x_oct: f32,
    pub y_oct: f32,
    pub sigma_oct: f32,
    pub orientation: f32,
    pub response: f32,
}

pub(crate) fn detect(space: &ScaleSpace, cfg: &FeatureConfig) -> Vec<Detection> {
    let mut detections = Vec::new();
    for (oi, octave) in space.octaves.iter().enumerate() {
        for d in 1..octave.dogs.len() - 1 {
            scan_dog_level(octave, oi, d, cfg, &mut detections);
        }
    }

    // Strongest responses win the keypoint budget.
    detections.sort_by(|a, b| {
        b.response
            .partial_cmp(&a.response)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    detections.truncate(cfg.max_keypoints);
    detections
}

fn scan_dog_level(
    octave: &Octave,
    oi: usize,
    d: usize,
    cfg: &FeatureConfig,
    out: &mut Vec<Detection>,
) {
    let dog = &octave.dogs[d];
    let below = &octave.dogs[d - 1];
    let above = &octave.dogs[d + 1];
    // Border margin keeps the orientation window inside the frame.
    let margin = 5usize;
    if dog.w <= 2 * margin || dog.h <= 2 * margin {
        return;
    }

    for y in margin..dog.h - margin {
        for x in margin..dog.w - margin {
            let v = dog.at(x, y);
            if v.abs() < cfg.contrast_threshold {
                continue;
            }
            if !is_extremum(dog, below, above, x, y, v) {
                continue;
            }
            if is_edge_response(dog, x, y, cfg.edge_threshold) {
                continue;
            }

            let sigma_oct = octave.sigmas[d];
            let gaussian = &octave.gaussians[d];
            for orientation in orientations(gaussian, x, y, sigma_oct) {
                out.push(Detection {
                    octave: oi,
                    level: d,
                    x_oct: x as f32,
                    y_oct: y as f32,
                    sigma_oct,
                    orientation,
                    response: v.abs(),
                });
            }
        }
    }
}

/// 26-neighbor extremum test across the three adjacent DoG levels.
fn is_extremum(dog: &GrayF32, below: &GrayF32, above: &GrayF32, x: usize, y: usize, v: f32) -> bool {
    let planes = [below, dog, above];
    for (pi, plane) in planes.iter().enumerate() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if pi == 1 && dx == 0 && dy == 0 {
                    continue;
                }
                let n = plane.at_clamped(x as i64 + dx, y as i64 + dy);
                // Ties lose: a plateau is not a stable extremum.
                if (v > 0.0 && n >= v) || (v <= 0.0 && n <= v) {
                    return false;
                }
            }
        }
    }
    true
}

/// Principal-curvature ratio test on the 2×2 spatial Hessian.
fn is_edge_response(dog: &GrayF32, x: usize, y: usize, edge_threshold: f32) -> bool {
    let (x, y) = (x as i64, y as i64);
    let c = dog.at_clamped(x, y);
    let dxx = dog.at_clamped(x + 1, y) + dog.at_clamped(x - 1, y) - 2.0 * c;
    let dyy = dog.at_clamped(x, y + 1) + dog.at_clamped(x, y - 1) - 2.0 * c;
    let dxy = (dog.at_clamped(x + 1, y + 1) - dog.at_clamped(x - 1, y + 1)
        - dog.at_clamped(x + 1, y - 1)
        + dog.at_clamped(x - 1, y - 1))
        / 4.0;
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    if det <= 0.0 {
        return true;
    }
    let r = edge_threshold;
    trace * trace / det >= (r + 1.0) * (r + 1.0) / r
}

/// Dominant gradient orientations around a point, in radians `[0, 2π)`.
fn orientations(gaussian: &GrayF32, x: usize, y: usize, sigma_oct: f32) -> Vec<f32> {
    let radius = (4.5 * sigma_oct).round().max(1.0) as i64;
    let weight_sigma = 1.5 * sigma_oct;
    let denom = 2.0 * weight_sigma * weight_sigma;

    let mut hist = [0.0f32; ORIENTATION_BINS];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let px = x as i64 + dx;
            let py = y as i64 + dy;
            if px < 1 || py < 1 || px >= gaussian.w as i64 - 1 || py >= gaussian.h as i64 - 1 {
                continue;
            }
            let gx = (gaussian.at(px as usize + 1, py as usize)
                - gaussian.at(px as usize - 1, py as usize))
                * 0.5;
            let gy = (gaussian.at(px as usize, py as usize + 1)
                - gaussian.at(px as usize, py as usize - 1))
                * 0.5;
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let weight = (-((dx * dx + dy * dy) as f32) / denom).exp();
            let angle = gy.atan2(gx).rem_euclid(2.0 * PI);
            let bin =
                ((angle / (2.0 * PI)) * ORIENTATION_BINS as f32) as usize % ORIENTATION_BINS;
            hist[bin] += weight * magnitude;
        }
    }

    smooth_histogram(&mut hist);

    let max = hist.iter().cloned().fold(0.0f32, f32::max);
    if max == 0.0 {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    for bin in 0..ORIENTATION_BINS {
        let prev = hist[(bin + ORIENTATION_BINS - 1) % ORIENTATION_BINS];
        let next = hist[(bin + 1) % ORIENTATION_BINS];
        let v = hist[bin];
        if v >= PEAK_RATIO * max && v > prev && v > next {
            // Parabolic refinement of the peak bin.
            let offset = 0.5 * (prev - next) / (prev - 2.0 * v + next);
            let refined = (bin as f32 + offset).rem_euclid(ORIENTATION_BINS as f32);
            peaks.push(refined * 2.0 * PI / ORIENTATION_BINS as f32);
        }
    }
    peaks
}

fn smooth_histogram(hist: &mut [f32; ORIENTATION_BINS]) {
    for _ in 0..2 {
        let snapshot = *hist;
        for bin in 0..ORIENTATION_BINS {
            let prev = snapshot[(bin + ORIENTATION_BINS - 1) % ORIENTATION_BINS];
            let next = snapshot[(bin + 1) % ORIENTATION_BINS];
            hist[bin] = 0.25 * prev + 0.5 * snapshot[bin] + 0.25 * next;
        }
    }
}
