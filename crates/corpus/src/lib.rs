//! Cover-art corpus ingestion and the derived LSH index.
//!
//! [`CoverCorpusIndex`] owns every fingerprint: it loads the catalog cover
//! directory once, computes a 256-bit perceptual hash and up to
//! `max_keypoints` keypoints + descriptors per image, and derives the banded
//! LSH bucket index so queries never rescan the directory. Once built, the
//! index is an immutable snapshot; queries take no locks.
//!
//! [`SharedCorpus`] wraps lazy construction for concurrent callers: however
//! many threads ask, the expensive build runs at most once, and later calls
//! are no-ops with zero file reads. Reloading a changed corpus means
//! constructing a fresh index; the bucket table is always rebuilt wholesale,
//! never patched.

mod art_cache;
pub mod config;
mod error;
pub mod lsh;
mod record;

pub use config::CorpusConfig;
pub use error::CorpusError;
pub use lsh::{LshIndex, BANDS};
pub use record::CoverRecord;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use art_cache::ArtCache;
use perceptual::CoverHash;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// In-memory fingerprint index over one cover catalog.
pub struct CoverCorpusIndex {
    cfg: CorpusConfig,
    records: Vec<CoverRecord>,
    by_id: HashMap<String, u32>,
    lsh: LshIndex,
    art: Mutex<ArtCache>,
}

impl CoverCorpusIndex {
    /// Load every cover image under `dir` and build the index.
    ///
    /// A missing (or empty) directory produces an index with zero covers, so
    /// every subsequent query resolves to "no match" rather than raising. A
    /// single file that fails to decode is logged and skipped; it never
    /// aborts the batch.
    pub fn load(dir: &Path, cfg: CorpusConfig) -> Result<Self, CorpusError> {
        cfg.validate()?;

        let mut paths = match std::fs::read_dir(dir) {
            Ok(entries) => {
                let mut paths = Vec::new();
                for entry in entries {
                    let path = entry?.path();
                    if has_image_extension(&path) {
                        paths.push(path);
                    }
                }
                paths
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "cover directory missing, index will be empty");
                Vec::new()
            }
            Err(err) => return Err(CorpusError::Io(err)),
        };
        // Deterministic record order regardless of directory enumeration.
        paths.sort();

        let total = paths.len();
        let records: Vec<CoverRecord> = paths
            .par_iter()
            .filter_map(|path| match image::open(path) {
                Ok(img) => Some(fingerprint(path, &img, &cfg)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping undecodable cover");
                    None
                }
            })
            .collect();

        if records.len() < total {
            info!(
                loaded = records.len(),
                skipped = total - records.len(),
                "corpus load finished with skips"
            );
        } else {
            info!(loaded = records.len(), "corpus load finished");
        }

        Ok(Self::from_records(records, cfg))
    }

    /// Build an index directly from prepared records (tests, alternate
    /// ingestion paths). The LSH table is derived here, wholesale.
    pub fn from_records(records: Vec<CoverRecord>, cfg: CorpusConfig) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.cover_id.clone(), i as u32))
            .collect();
        let lsh = LshIndex::build(
            records
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.hash.map(|h| (i as u32, h))),
        );
        debug!(covers = records.len(), "lsh index rebuilt");
        let art_capacity = cfg.art_cache_capacity;
        Self {
            cfg,
            records,
            by_id,
            lsh,
            art: Mutex::new(ArtCache::new(art_capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cfg(&self) -> &CorpusConfig {
        &self.cfg
    }

    pub fn records(&self) -> &[CoverRecord] {
        &self.records
    }

    pub fn record(&self, index: u32) -> &CoverRecord {
        &self.records[index as usize]
    }

    /// Look a record up by its public string id.
    pub fn get(&self, cover_id: &str) -> Option<&CoverRecord> {
        self.by_id.get(cover_id).map(|&i| self.record(i))
    }

    pub fn lsh(&self) -> &LshIndex {
        &self.lsh
    }

    /// LSH candidate indices for a query hash.
    pub fn candidates_for(&self, hash: &CoverHash) -> Vec<u32> {
        self.lsh.candidates(hash)
    }

    /// Decode the stored art for a cover, via the bounded LRU cache.
    pub fn cover_art(&self, cover_id: &str) -> Option<DynamicImage> {
        let record = self.get(cover_id)?;
        let path = record.path.as_ref()?;
        let mut cache = self.art.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(img) = cache.get(cover_id) {
            return Some(img);
        }
        match image::open(path) {
            Ok(img) => {
                cache.insert(cover_id.to_string(), img.clone());
                Some(img)
            }
            Err(err) => {
                warn!(cover_id, error = %err, "stored cover art no longer decodable");
                None
            }
        }
    }
}

fn fingerprint(path: &Path, img: &DynamicImage, cfg: &CorpusConfig) -> CoverRecord {
    let cover_id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let hash = Some(perceptual::hash_image(img, &cfg.hash));
    let extracted = features::extract(img, &cfg.features);
    let features = if extracted.is_empty() {
        None
    } else {
        Some(extracted)
    };
    CoverRecord {
        cover_id,
        path: Some(path.to_path_buf()),
        hash,
        features,
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Lazily-built, shareable corpus handle.
///
/// Construction happens at most once no matter how many threads call
/// [`SharedCorpus::ensure_loaded`] concurrently; every caller then shares the
/// same immutable snapshot.
pub struct SharedCorpus {
    dir: PathBuf,
    cfg: CorpusConfig,
    state: OnceCell<Arc<CoverCorpusIndex>>,
    loads: AtomicU32,
}

impl SharedCorpus {
    pub fn new(dir: impl Into<PathBuf>, cfg: CorpusConfig) -> Self {
        Self {
            dir: dir.into(),
            cfg,
            state: OnceCell::new(),
            loads: AtomicU32::new(0),
        }
    }

    /// Return the loaded index, building it on first use.
    pub fn ensure_loaded(&self) -> Result<Arc<CoverCorpusIndex>, CorpusError> {
        self.state
            .get_or_try_init(|| {
                self.loads.fetch_add(1, Ordering::Relaxed);
                CoverCorpusIndex::load(&self.dir, self.cfg.clone()).map(Arc::new)
            })
            .cloned()
    }

    /// Snapshot without triggering a build.
    pub fn get(&self) -> Option<Arc<CoverCorpusIndex>> {
        self.state.get().cloned()
    }

    /// How many times the underlying build actually ran (0 or 1).
    pub fn load_count(&self) -> u32 {
        self.loads.load(Ordering::Relaxed)
    }
}
