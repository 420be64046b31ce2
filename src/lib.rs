//! Umbrella crate for cover-art identification.
//!
//! This crate stitches the pipeline stages together so callers can go from a
//! photograph to catalog song records with a single API entry point:
//!
//! - `cover-perceptual` — 256-bit DCT perceptual hashes
//! - `cover-features` — scale-space keypoints, descriptors, RANSAC geometry
//! - `cover-corpus` — one-time corpus ingestion and the banded LSH index
//! - `cover-matcher` — the two-phase engine and song resolution
//!
//! ```no_run
//! use covermatch::{find_song_by_cover, CorpusConfig, MatchOptions, SharedCorpus};
//!
//! let corpus = SharedCorpus::new("cache/covers", CorpusConfig::default());
//! let photo = image::open("photo.jpg").unwrap();
//! let songs = find_song_by_cover(&corpus, &photo, &[], &MatchOptions::default()).unwrap();
//! ```
//!
//! The matching subsystem performs no blocking I/O after the corpus is
//! loaded and holds no per-request state: queries may run concurrently
//! against one [`SharedCorpus`] without synchronization. "No match" is an
//! empty result, not an error.

pub mod config;

pub use config::PipelineConfig;
pub use corpus::{
    CorpusConfig, CorpusError, CoverCorpusIndex, CoverRecord, LshIndex, SharedCorpus, BANDS,
};
pub use features::{
    extract, DescriptorIndex, FeatureConfig, FeatureSet, KeyPoint, KnnConfig, RansacConfig,
    DESCRIPTOR_LEN,
};
pub use matcher::{
    resolve, resolve_all, CoverMatcher, FeatureMatchConfig, HashMatchConfig, MatchCandidate,
    MatchError, MatchMethod, MatchOptions, MatcherConfig, SheetType, SongRecord,
};
pub use perceptual::{hash_image, CoverHash, HashConfig, HASH_BITS};

use image::DynamicImage;

/// Identify the cover shown in `image`, using default engine settings.
///
/// Loads the corpus on first use. Returns the best match, or a ranked list
/// when `opts.return_multiple` is set; an empty list means no cover was
/// identified.
pub fn find_similar_cover(
    corpus: &SharedCorpus,
    image: &DynamicImage,
    opts: &MatchOptions,
) -> Result<Vec<MatchCandidate>, MatchError> {
    find_similar_cover_with(corpus, &MatcherConfig::default(), image, opts)
}

/// [`find_similar_cover`] with explicit engine configuration.
pub fn find_similar_cover_with(
    corpus: &SharedCorpus,
    cfg: &MatcherConfig,
    image: &DynamicImage,
    opts: &MatchOptions,
) -> Result<Vec<MatchCandidate>, MatchError> {
    let index = corpus.ensure_loaded()?;
    CoverMatcher::new(index, *cfg)?.find_similar_cover(image, opts)
}

/// Identify the cover in `image` and resolve it to catalog songs.
pub fn find_song_by_cover(
    corpus: &SharedCorpus,
    image: &DynamicImage,
    catalog: &[SongRecord],
    opts: &MatchOptions,
) -> Result<Vec<SongRecord>, MatchError> {
    find_song_by_cover_with(corpus, &MatcherConfig::default(), image, catalog, opts)
}

/// [`find_song_by_cover`] with explicit engine configuration.
pub fn find_song_by_cover_with(
    corpus: &SharedCorpus,
    cfg: &MatcherConfig,
    image: &DynamicImage,
    catalog: &[SongRecord],
    opts: &MatchOptions,
) -> Result<Vec<SongRecord>, MatchError> {
    let index = corpus.ensure_loaded()?;
    CoverMatcher::new(index, *cfg)?.find_song_by_cover(image, catalog, opts)
}
