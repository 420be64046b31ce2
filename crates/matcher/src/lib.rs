//! Two-phase cover matching: LSH-backed perceptual hashing with a
//! feature-and-geometry fallback, plus resolution of matched covers to
//! catalog songs.
//!
//! The entry point is [`CoverMatcher`], built over an immutable
//! [`corpus::CoverCorpusIndex`] snapshot. Each request runs the hash phase
//! first and pays for feature matching only when hashing finds nothing.

mod engine;
mod feature_match;
mod hash_match;
mod resolver;
mod types;

pub use engine::{CoverMatcher, MatcherConfig};
pub use feature_match::FeatureMatchConfig;
pub use hash_match::HashMatchConfig;
pub use resolver::{resolve, resolve_all, SheetType, SongRecord};
pub use types::{MatchCandidate, MatchError, MatchMethod, MatchOptions};
