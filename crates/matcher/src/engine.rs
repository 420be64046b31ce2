//! The two-phase matching engine.

use std::sync::Arc;

use corpus::CoverCorpusIndex;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::feature_match::{FeatureMatchConfig, FeatureMatcher};
use crate::hash_match::{HashMatchConfig, HashMatcher};
use crate::resolver;
use crate::types::{MatchCandidate, MatchError, MatchOptions};
use crate::SongRecord;


/// Engine-level configuration, aggregating both phases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MatcherConfig {
    #[serde(default)]
    pub hash: HashMatchConfig,
    #[serde(default)]
    pub feature: FeatureMatchConfig,
}

impl MatcherConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), MatchError> {
        self.feature.validate().map_err(MatchError::InvalidOptions)
    }
}

/// Phase of the matching state machine. Hash always runs first: it is
/// near-constant time through the LSH index and highly precise on unmodified
/// images, while the feature phase costs O(corpus × descriptors) and is only
/// paid when hashing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchPhase {
    Hash,
    Feature,
}

/// Two-phase cover matcher over a loaded corpus snapshot.
///
/// Stateless per request: any number of queries may run concurrently against
/// the same engine, since the corpus is immutable once built.
pub struct CoverMatcher {
    corpus: Arc<CoverCorpusIndex>,
    cfg: MatcherConfig,
}

impl CoverMatcher {
    pub fn new(corpus: Arc<CoverCorpusIndex>, cfg: MatcherConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { corpus, cfg })
    }

    pub fn corpus(&self) -> &Arc<CoverCorpusIndex> {
        &self.corpus
    }

    /// Identify the cover shown in `image`.
    ///
    /// An empty result means both phases ran out, a common and expected
    /// outcome rather than an error.
    pub fn find_similar_cover(
        &self,
        image: &DynamicImage,
        opts: &MatchOptions,
    ) -> Result<Vec<MatchCandidate>, MatchError> {
        opts.validate()?;

        let mut phase = MatchPhase::Hash;
        loop {
            match phase {
                MatchPhase::Hash => {
                    let query_hash = perceptual::hash_image(image, &self.corpus.cfg().hash);
                    let hits =
                        HashMatcher::new(&self.corpus, &self.cfg.hash).run(&query_hash, opts);
                    if !hits.is_empty() {
                        info!(
                            cover_id = %hits[0].cover_id,
                            confidence = hits[0].confidence,
                            "matched via hash phase"
                        );
                        return Ok(hits);
                    }
                    debug!("hash phase empty, falling through to features");
                    phase = MatchPhase::Feature;
                }
                MatchPhase::Feature => {
                    let query = features::extract(image, &self.corpus.cfg().features);
                    let hits =
                        FeatureMatcher::new(&self.corpus, &self.cfg.feature).run(&query, opts);
                    match hits.first() {
                        Some(best) => info!(
                            cover_id = %best.cover_id,
                            score = best.confidence,
                            "matched via feature phase"
                        ),
                        None => info!("no match in either phase"),
                    }
                    return Ok(hits);
                }
            }
        }
    }

    /// Identify the cover and resolve it to catalog song records.
    pub fn find_song_by_cover(
        &self,
        image: &DynamicImage,
        catalog: &[SongRecord],
        opts: &MatchOptions,
    ) -> Result<Vec<SongRecord>, MatchError> {
        let candidates = self.find_similar_cover(image, opts)?;
        Ok(resolver::resolve_all(&candidates, catalog))
    }
}
