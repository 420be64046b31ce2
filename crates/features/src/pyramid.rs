//! Gaussian scale space and difference-of-Gaussians pyramid.

use crate::config::FeatureConfig;

/// Minimum side length before octave construction stops.
const MIN_OCTAVE_SIDE: usize = 16;

/// Assumed blur already present in the input image.
const ASSUMED_BLUR: f32 = 0.5;

/// Single-channel float image, intensities in `0.0..=1.0`.
#[derive(Debug, Clone)]
pub(crate) struct GrayF32 {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl GrayF32 {
    pub fn from_luma8(img: &image::GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let data = img.as_raw().iter().map(|&p| f32::from(p) / 255.0).collect();
        Self { w, h, data }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    /// Clamped integer access, tolerating coordinates just outside the frame.
    #[inline]
    pub fn at_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.w as i64 - 1) as usize;
        let y = y.clamp(0, self.h as i64 - 1) as usize;
        self.at(x, y)
    }

    /// Bilinear sample with clamped borders.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let p00 = self.at_clamped(x0, y0);
        let p10 = self.at_clamped(x0 + 1, y0);
        let p01 = self.at_clamped(x0, y0 + 1);
        let p11 = self.at_clamped(x0 + 1, y0 + 1);
        p00 * (1.0 - fx) * (1.0 - fy)
            + p10 * fx * (1.0 - fy)
            + p01 * (1.0 - fx) * fy
            + p11 * fx * fy
    }

    /// Central-difference gradient `(dx, dy)` at a subpixel position.
    pub fn gradient(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = self.sample(x + 1.0, y) - self.sample(x - 1.0, y);
        let dy = self.sample(x, y + 1.0) - self.sample(x, y - 1.0);
        (dx * 0.5, dy * 0.5)
    }

    /// Decimate by 2 (every other pixel).
    fn downsample(&self) -> Self {
        let w = (self.w / 2).max(1);
        let h = (self.h / 2).max(1);
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(self.at(x * 2, y * 2));
            }
        }
        Self { w, h, data }
    }
}

/// Separable Gaussian blur with clamped borders.
pub(crate) fn gaussian_blur(src: &GrayF32, sigma: f32) -> GrayF32 {
    if sigma <= 0.0 {
        return src.clone();
    }
    let radius = (sigma * 3.0).ceil() as i64;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let denom = 2.0 * sigma * sigma;
    for i in -radius..=radius {
        kernel.push((-(i * i) as f32 / denom).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }

    // Horizontal pass.
    let mut tmp = GrayF32 {
        w: src.w,
        h: src.h,
        data: vec![0.0; src.w * src.h],
    };
    for y in 0..src.h {
        for x in 0..src.w {
            let mut acc = 0.0;
            for (ki, &k) in kernel.iter().enumerate() {
                acc += k * src.at_clamped(x as i64 + ki as i64 - radius, y as i64);
            }
            tmp.data[y * src.w + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = GrayF32 {
        w: src.w,
        h: src.h,
        data: vec![0.0; src.w * src.h],
    };
    for y in 0..src.h {
        for x in 0..src.w {
            let mut acc = 0.0;
            for (ki, &k) in kernel.iter().enumerate() {
                acc += k * tmp.at_clamped(x as i64, y as i64 + ki as i64 - radius);
            }
            out.data[y * out.w + x] = acc;
        }
    }
    out
}

/// One octave of the pyramid.
pub(crate) struct Octave {
    /// Sampling step of this octave relative to the input image (1, 2, 4, …).
    pub step: f32,
    /// `scales_per_octave + 3` progressively blurred images.
    pub gaussians: Vec<GrayF32>,
    /// `scales_per_octave + 2` difference images, `dogs[i] = g[i+1] - g[i]`.
    pub dogs: Vec<GrayF32>,
    /// Per-octave blur of each gaussian level.
    pub sigmas: Vec<f32>,
}

pub(crate) struct ScaleSpace {
    pub octaves: Vec<Octave>,
}

impl ScaleSpace {
    pub fn build(base: &GrayF32, cfg: &FeatureConfig) -> Self {
        let s = cfg.scales_per_octave;
        let k = 2.0f32.powf(1.0 / s as f32);

        // Bring the input up to the base blur level.
        let initial = (cfg.sigma * cfg.sigma - ASSUMED_BLUR * ASSUMED_BLUR)
            .max(0.0)
            .sqrt();
        let mut current = gaussian_blur(base, initial);
        let mut step = 1.0f32;

        let mut octaves = Vec::new();
        for _ in 0..cfg.octaves {
            if current.w < MIN_OCTAVE_SIDE || current.h < MIN_OCTAVE_SIDE {
                break;
            }

            let mut gaussians = Vec::with_capacity(s + 3);
            let mut sigmas = Vec::with_capacity(s + 3);
            gaussians.push(current.clone());
            sigmas.push(cfg.sigma);
            for level in 1..s + 3 {
                let prev_sigma = cfg.sigma * k.powi(level as i32 - 1);
                let extra = prev_sigma * (k * k - 1.0).sqrt();
                let blurred = gaussian_blur(&gaussians[level - 1], extra);
                gaussians.push(blurred);
                sigmas.push(prev_sigma * k);
            }

            let mut dogs = Vec::with_capacity(s + 2);
            for level in 0..s + 2 {
                let a = &gaussians[level];
                let b = &gaussians[level + 1];
                let data = b
                    .data
                    .iter()
                    .zip(a.data.iter())
                    .map(|(&hi, &lo)| hi - lo)
                    .collect();
                dogs.push(GrayF32 {
                    w: a.w,
                    h: a.h,
                    data,
                });
            }

            // Seed the next octave from the gaussian whose blur is 2·sigma.
            current = gaussians[s].downsample();
            octaves.push(Octave {
                step,
                gaussians,
                dogs,
                sigmas,
            });
            step *= 2.0;
        }

        Self { octaves }
    }
}
