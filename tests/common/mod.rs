//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};

/// Deterministic blob-field image: strong low-frequency structure for the
/// hash path and plenty of corners for the feature path.
pub fn blob_image(seed: u64, w: u32, h: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut img = GrayImage::from_pixel(w, h, Luma([105u8]));
    for _ in 0..80 {
        let cx = (next() % u64::from(w)) as i64;
        let cy = (next() % u64::from(h)) as i64;
        let r = (3 + next() % 10) as i64;
        // Shades spread across the range, away from the background level, so
        // every blob has contrast and local constellations stay distinctive.
        let shade = if next() % 2 == 0 {
            (160 + next() % 96) as u8
        } else {
            (next() % 70) as u8
        };
        for y in (cy - r).max(0)..(cy + r).min(i64::from(h)) {
            for x in (cx - r).max(0)..(cx + r).min(i64::from(w)) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x as u32, y as u32, Luma([shade]));
                }
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Write `ids.len()` synthetic covers into `dir`, one png per id.
pub fn write_corpus(dir: &Path, ids: &[&str]) {
    for (i, id) in ids.iter().enumerate() {
        let img = blob_image(1000 + i as u64, 200, 200);
        img.save(dir.join(format!("{id}.png"))).expect("write cover");
    }
}

/// Add deterministic ±magnitude noise to every pixel.
pub fn add_noise(img: &DynamicImage, magnitude: i16, seed: u64) -> DynamicImage {
    let mut state = seed | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let gray = img.to_luma8();
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let span = 2 * magnitude + 1;
        let delta = (next() % span as u64) as i16 - magnitude;
        let value = (i16::from(pixel[0]) + delta).clamp(0, 255) as u8;
        out.put_pixel(x, y, Luma([value]));
    }
    DynamicImage::ImageLuma8(out)
}
