//! 128-dimensional gradient descriptors over a rotated 4×4 cell grid.

use std::f32::consts::PI;

use crate::pyramid::GrayF32;
use crate::sift::Detection;

/// Spatial cells per side.
const GRID: usize = 4;
/// Orientation bins per cell.
const BINS: usize = 8;
/// Descriptor length: 4 × 4 × 8.
pub const DESCRIPTOR_LEN: usize = GRID * GRID * BINS;

/// Per-element clamp applied between the two normalization passes; large
/// single-gradient spikes otherwise dominate the vector under non-linear
/// illumination changes.
const CLAMP: f32 = 0.2;

/// Histogram bin width in octave pixels, per unit of keypoint scale.
const BIN_WIDTH_PER_SIGMA: f32 = 3.0;

/// Compute the descriptor for one detection, sampling the gaussian image the
/// detection was found in. Returns `None` when the sampling window falls
/// outside the frame.
pub(crate) fn describe(gaussian: &GrayF32, det: &Detection) -> Option<Vec<f32>> {
    let bin_width = BIN_WIDTH_PER_SIGMA * det.sigma_oct;
    // Radius of the rotated sampling window.
    let radius = (bin_width * (GRID as f32 + 1.0) * std::f32::consts::SQRT_2 / 2.0)
        .round()
        .max(1.0) as i64;

    let cx = det.x_oct;
    let cy = det.y_oct;
    if cx as i64 - radius < 0
        || cy as i64 - radius < 0
        || cx as i64 + radius >= gaussian.w as i64
        || cy as i64 + radius >= gaussian.h as i64
    {
        return None;
    }

    let cos_t = det.orientation.cos();
    let sin_t = det.orientation.sin();
    let weight_denom = 2.0 * (0.5 * GRID as f32 * bin_width).powi(2);

    let mut hist = [0.0f32; DESCRIPTOR_LEN];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            // Rotate the offset into the keypoint frame.
            let rx = (cos_t * dx as f32 + sin_t * dy as f32) / bin_width;
            let ry = (-sin_t * dx as f32 + cos_t * dy as f32) / bin_width;
            // Cell coordinates, centered on the 4×4 grid.
            let cbin_x = rx + GRID as f32 / 2.0 - 0.5;
            let cbin_y = ry + GRID as f32 / 2.0 - 0.5;
            if cbin_x <= -1.0
                || cbin_y <= -1.0
                || cbin_x >= GRID as f32
                || cbin_y >= GRID as f32
            {
                continue;
            }

            let (gx, gy) = gaussian.gradient(cx + dx as f32, cy + dy as f32);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let weight = (-(rx * rx + ry * ry) * bin_width * bin_width / weight_denom).exp();
            let angle = (gy.atan2(gx) - det.orientation).rem_euclid(2.0 * PI);
            let obin = angle / (2.0 * PI) * BINS as f32;

            accumulate(&mut hist, cbin_x, cbin_y, obin, weight * magnitude);
        }
    }

    Some(finalize(hist))
}

/// Trilinear accumulation into the (cell_x, cell_y, orientation) histogram.
fn accumulate(hist: &mut [f32; DESCRIPTOR_LEN], cx: f32, cy: f32, obin: f32, value: f32) {
    let x0 = cx.floor() as i64;
    let y0 = cy.floor() as i64;
    let o0 = obin.floor() as i64;
    let fx = cx - x0 as f32;
    let fy = cy - y0 as f32;
    let fo = obin - o0 as f32;

    for (ix, wx) in [(x0, 1.0 - fx), (x0 + 1, fx)] {
        if ix < 0 || ix >= GRID as i64 {
            continue;
        }
        for (iy, wy) in [(y0, 1.0 - fy), (y0 + 1, fy)] {
            if iy < 0 || iy >= GRID as i64 {
                continue;
            }
            for (io, wo) in [(o0, 1.0 - fo), (o0 + 1, fo)] {
                let io = (io.rem_euclid(BINS as i64)) as usize;
                let idx = (iy as usize * GRID + ix as usize) * BINS + io;
                hist[idx] += value * wx * wy * wo;
            }
        }
    }
}

fn finalize(mut hist: [f32; DESCRIPTOR_LEN]) -> Vec<f32> {
    normalize(&mut hist);
    for v in hist.iter_mut() {
        if *v > CLAMP {
            *v = CLAMP;
        }
    }
    normalize(&mut hist);
    hist.to_vec()
}

fn normalize(hist: &mut [f32; DESCRIPTOR_LEN]) {
    let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in hist.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sift::Detection;

    fn gradient_image(w: usize, h: usize) -> GrayF32 {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push((x + y) as f32 / (w + h) as f32);
            }
        }
        GrayF32 { w, h, data }
    }

    fn center_detection(w: usize, h: usize) -> Detection {
        Detection {
            octave: 0,
            level: 1,
            x_oct: w as f32 / 2.0,
            y_oct: h as f32 / 2.0,
            sigma_oct: 1.6,
            orientation: 0.0,
            response: 1.0,
        }
    }

    #[test]
    fn descriptor_has_unit_norm() {
        let img = gradient_image(64, 64);
        let desc = describe(&img, &center_detection(64, 64)).expect("window fits");
        assert_eq!(desc.len(), DESCRIPTOR_LEN);
        let norm: f32 = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm = {norm}");
    }

    #[test]
    fn window_outside_frame_is_rejected() {
        let img = gradient_image(64, 64);
        let mut det = center_detection(64, 64);
        det.x_oct = 1.0;
        assert!(describe(&img, &det).is_none());
    }

    #[test]
    fn elements_respect_clamp() {
        let img = gradient_image(64, 64);
        let desc = describe(&img, &center_detection(64, 64)).expect("window fits");
        // Post-clamp renormalization can push elements slightly past CLAMP.
        for &v in &desc {
            assert!(v <= CLAMP * 1.5 + 1e-6);
            assert!(v >= 0.0);
        }
    }
}
