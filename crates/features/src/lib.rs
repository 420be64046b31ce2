//! Local-feature extraction and geometric verification for cover-art
//! identification.
//!
//! This crate carries the slow, robust half of the matching pipeline: a
//! scale-space keypoint detector with 128-dimensional gradient descriptors
//! (rotation- and scale-invariant), a descriptor k-NN index, and RANSAC
//! homography fitting. The fast hash path lives in `cover-perceptual`; this
//! path is what survives photographs of a screen: rotation, perspective,
//! partial crops.

pub mod config;
mod descriptor;
pub mod geometry;
pub mod knn;
mod pyramid;
mod sift;

pub use config::FeatureConfig;
pub use descriptor::DESCRIPTOR_LEN;
pub use geometry::{ransac_homography, Correspondence, HomographyFit, RansacConfig};
pub use knn::{DescriptorIndex, KnnConfig, Neighbor};

use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pyramid::{GrayF32, ScaleSpace};

/// A detected keypoint in input-image pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    /// Characteristic scale, in input-image pixels.
    pub scale: f32,
    /// Dominant gradient orientation, radians in `[0, 2π)`.
    pub orientation: f32,
    /// Detection strength (absolute DoG response).
    pub response: f32,
}

/// Keypoints and their descriptors, index-aligned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureSet {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Vec<f32>>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Errors produced by the feature layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureError {
    /// Invalid feature configuration.
    #[error("invalid feature config: {0}")]
    InvalidConfig(String),
}

/// Extract keypoints and descriptors from an image.
///
/// A low-texture image simply yields few (or zero) keypoints; that is an
/// expected outcome, not an error.
pub fn extract(img: &DynamicImage, cfg: &FeatureConfig) -> FeatureSet {
    let base = GrayF32::from_luma8(&img.to_luma8());
    let space = ScaleSpace::build(&base, cfg);
    let detections = sift::detect(&space, cfg);

    // Descriptor sampling is independent per detection.
    let described: Vec<(KeyPoint, Vec<f32>)> = detections
        .par_iter()
        .filter_map(|det| {
            let gaussian = &space.octaves[det.octave].gaussians[det.level];
            let step = space.octaves[det.octave].step;
            descriptor::describe(gaussian, det).map(|desc| {
                (
                    KeyPoint {
                        x: det.x_oct * step,
                        y: det.y_oct * step,
                        scale: det.sigma_oct * step,
                        orientation: det.orientation,
                        response: det.response,
                    },
                    desc,
                )
            })
        })
        .collect();

    let mut set = FeatureSet::default();
    for (kp, desc) in described {
        set.keypoints.push(kp);
        set.descriptors.push(desc);
    }
    set
}
