//! Mapping matched covers back to catalog song records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::MatchCandidate;

/// Presentation cap on resolved songs across all matched covers.
const MAX_RESOLVED_SONGS: usize = 5;

/// Chart variant of a catalog entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SheetType {
    /// Standard chart.
    Std,
    /// Deluxe chart.
    Dx,
    /// Party ("utage") chart.
    Utage,
}

/// One catalog song entry. Loaded by an out-of-scope data loader; anything
/// beyond the fields the resolver needs rides along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongRecord {
    pub title: String,
    #[serde(rename = "type")]
    pub sheet_type: SheetType,
    /// Cover image name as the catalog stores it, usually with a `.png`
    /// extension, sometimes without.
    pub cover_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SongRecord {
    pub fn new(title: &str, sheet_type: SheetType, cover_name: &str) -> Self {
        Self {
            title: title.to_string(),
            sheet_type,
            cover_name: cover_name.to_string(),
            extra: Map::new(),
        }
    }
}

/// All catalog entries whose cover matches `cover_id`.
///
/// The corpus identifies covers by file stem while the catalog stores the
/// name with its extension, so both spellings are accepted. A cover with no
/// catalog entry is corpus/catalog drift: logged, empty result, not an
/// error.
pub fn resolve(cover_id: &str, catalog: &[SongRecord]) -> Vec<SongRecord> {
    let with_ext = format!("{cover_id}.png");
    let songs: Vec<SongRecord> = catalog
        .iter()
        .filter(|song| song.cover_name == cover_id || song.cover_name == with_ext)
        .cloned()
        .collect();
    if songs.is_empty() {
        warn!(cover_id, "matched cover has no catalog entry");
    }
    songs
}

/// Resolve every matched cover and flatten the results.
///
/// When the flattened set exceeds the presentation cap it is first narrowed
/// to standard/deluxe variants (the party variant shares art with its base
/// chart and only crowds the list), then truncated.
pub fn resolve_all(candidates: &[MatchCandidate], catalog: &[SongRecord]) -> Vec<SongRecord> {
    let mut songs: Vec<SongRecord> = candidates
        .iter()
        .flat_map(|candidate| resolve(&candidate.cover_id, catalog))
        .collect();

    if songs.len() > MAX_RESOLVED_SONGS {
        songs.retain(|song| song.sheet_type != SheetType::Utage);
        songs.truncate(MAX_RESOLVED_SONGS);
    }
    songs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchMethod;

    fn candidate(cover_id: &str) -> MatchCandidate {
        MatchCandidate {
            cover_id: cover_id.to_string(),
            confidence: 90.0,
            method: MatchMethod::Hash,
        }
    }

    #[test]
    fn resolves_with_and_without_extension() {
        let catalog = vec![
            SongRecord::new("Song A", SheetType::Std, "abc123.png"),
            SongRecord::new("Song B", SheetType::Dx, "abc123"),
            SongRecord::new("Other", SheetType::Std, "zzz.png"),
        ];
        let songs = resolve("abc123", &catalog);
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().any(|s| s.title == "Song A"));
        assert!(songs.iter().any(|s| s.title == "Song B"));
    }

    #[test]
    fn one_cover_may_map_to_multiple_variants() {
        let catalog = vec![
            SongRecord::new("Shared", SheetType::Std, "cover.png"),
            SongRecord::new("Shared", SheetType::Dx, "cover.png"),
        ];
        let songs = resolve_all(&[candidate("cover")], &catalog);
        assert_eq!(songs.len(), 2);
    }

    #[test]
    fn drift_yields_empty_not_error() {
        let catalog = vec![SongRecord::new("Song", SheetType::Std, "known.png")];
        assert!(resolve("unknown", &catalog).is_empty());
    }

    #[test]
    fn overflow_drops_utage_then_truncates() {
        let mut catalog = Vec::new();
        for i in 0..4 {
            catalog.push(SongRecord::new(
                &format!("Std {i}"),
                SheetType::Std,
                "art.png",
            ));
        }
        catalog.push(SongRecord::new("Party", SheetType::Utage, "art.png"));
        catalog.push(SongRecord::new("Dx", SheetType::Dx, "art.png"));

        let songs = resolve_all(&[candidate("art")], &catalog);
        assert_eq!(songs.len(), 5);
        assert!(songs.iter().all(|s| s.sheet_type != SheetType::Utage));
    }

    #[test]
    fn under_cap_keeps_utage() {
        let catalog = vec![
            SongRecord::new("Base", SheetType::Std, "art.png"),
            SongRecord::new("Party", SheetType::Utage, "art.png"),
        ];
        let songs = resolve_all(&[candidate("art")], &catalog);
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().any(|s| s.sheet_type == SheetType::Utage));
    }

    #[test]
    fn song_record_deserializes_catalog_json() {
        let json = r#"{
            "title": "Tutorial",
            "type": "dx",
            "cover_name": "deadbeef.png",
            "artist": "Somebody",
            "level": 13.2
        }"#;
        let song: SongRecord = serde_json::from_str(json).unwrap();
        assert_eq!(song.sheet_type, SheetType::Dx);
        assert_eq!(song.extra["artist"], "Somebody");
    }
}
