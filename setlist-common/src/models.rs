//! Tracklist and catalog record types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Trust rank of an import's origin
///
/// Variants are declared in ascending reliability; the derived `Ord` is the
/// precedence order used for upgrades. Changing the order is a behavior
/// change for every stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Audience comment under a published performance
    Comment,
    /// The performance's own description text
    Description,
    /// Curated tracklist site
    Tracklist,
    /// Confirmed by the identification oracle
    AudioId,
    /// Explicit manual confirmation
    Manual,
}

impl SourceTag {
    /// Stable storage name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Description => "description",
            Self::Tracklist => "tracklist",
            Self::AudioId => "audio_id",
            Self::Manual => "manual",
        }
    }

    /// Numeric rank (1 = least reliable)
    pub fn rank(self) -> u8 {
        match self {
            Self::Comment => 1,
            Self::Description => 2,
            Self::Tracklist => 3,
            Self::AudioId => 4,
            Self::Manual => 5,
        }
    }

    /// True when `self` is strictly more reliable than `other`
    pub fn outranks(self, other: SourceTag) -> bool {
        self.rank() > other.rank()
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comment" => Ok(Self::Comment),
            "description" => Ok(Self::Description),
            "tracklist" => Ok(Self::Tracklist),
            "audio_id" => Ok(Self::AudioId),
            "manual" => Ok(Self::Manual),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown source tag: {}",
                other
            ))),
        }
    }
}

/// One persisted tracklist position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTrackEntry {
    pub id: Uuid,
    pub performance_id: Uuid,
    /// 1-based; may be sparse
    pub position: u32,
    pub artist_name: String,
    pub track_title: String,
    /// 0 = unknown position-in-time
    pub timestamp_seconds: u32,
    pub timestamp_formatted: Option<String>,
    pub source_tag: SourceTag,
    pub is_unreleased: bool,
    pub unreleased_reason: Option<String>,
    /// Set only by the identification oracle
    pub external_match_payload: Option<serde_json::Value>,
    pub track_id: Option<Uuid>,
    pub artist_id: Option<Uuid>,
}

impl CanonicalTrackEntry {
    /// Whether the entry carries a confirmed time code
    pub fn has_timestamp(&self) -> bool {
        self.timestamp_seconds > 0
    }
}

/// Entry payload for insertion (storage assigns the id)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackEntry {
    pub performance_id: Uuid,
    pub position: u32,
    pub artist_name: String,
    pub track_title: String,
    pub timestamp_seconds: u32,
    pub timestamp_formatted: Option<String>,
    pub source_tag: SourceTag,
    pub is_unreleased: bool,
    pub unreleased_reason: Option<String>,
    pub external_match_payload: Option<serde_json::Value>,
    pub track_id: Option<Uuid>,
    pub artist_id: Option<Uuid>,
}

impl NewTrackEntry {
    /// Attach the storage id
    pub fn into_entry(self, id: Uuid) -> CanonicalTrackEntry {
        CanonicalTrackEntry {
            id,
            performance_id: self.performance_id,
            position: self.position,
            artist_name: self.artist_name,
            track_title: self.track_title,
            timestamp_seconds: self.timestamp_seconds,
            timestamp_formatted: self.timestamp_formatted,
            source_tag: self.source_tag,
            is_unreleased: self.is_unreleased,
            unreleased_reason: self.unreleased_reason,
            external_match_payload: self.external_match_payload,
            track_id: self.track_id,
            artist_id: self.artist_id,
        }
    }
}

/// Additive field update for an existing entry
///
/// Only provenance and time code may change; identity fields are absent
/// from this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub source_tag: Option<SourceTag>,
    pub timestamp_seconds: Option<u32>,
    pub timestamp_formatted: Option<String>,
}

impl EntryUpdate {
    /// No field would change
    pub fn is_empty(&self) -> bool {
        self.source_tag.is_none() && self.timestamp_seconds.is_none()
    }
}

/// Global catalog artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogArtist {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub verified: bool,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    /// Tracks + entries pointing at this artist (computed on read)
    pub reference_count: u64,
}

/// Global catalog track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTrack {
    pub id: Uuid,
    pub title: String,
    pub title_normalized: String,
    pub artist_id: Option<Uuid>,
    pub artist_name: String,
    pub label: Option<String>,
    pub bpm: Option<f64>,
    pub external_url: Option<String>,
    pub verified: bool,
    pub times_played: i64,
    /// Entries pointing at this track (computed on read)
    pub reference_count: u64,
}

/// Performance row as seen by catalog maintenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub artist_name: Option<String>,
    /// Identifier at the source the performance was scraped from
    pub external_id: Option<String>,
    /// Tracklist entries of this performance (computed on read)
    pub entry_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_order_is_precedence() {
        assert!(SourceTag::Comment < SourceTag::Description);
        assert!(SourceTag::Description < SourceTag::Tracklist);
        assert!(SourceTag::Tracklist < SourceTag::AudioId);
        assert!(SourceTag::AudioId < SourceTag::Manual);
    }

    #[test]
    fn test_outranks_is_strict() {
        assert!(SourceTag::Tracklist.outranks(SourceTag::Comment));
        assert!(!SourceTag::Tracklist.outranks(SourceTag::Tracklist));
        assert!(!SourceTag::Comment.outranks(SourceTag::Manual));
    }

    #[test]
    fn test_source_tag_string_roundtrip() {
        for tag in [
            SourceTag::Comment,
            SourceTag::Description,
            SourceTag::Tracklist,
            SourceTag::AudioId,
            SourceTag::Manual,
        ] {
            assert_eq!(tag.as_str().parse::<SourceTag>().unwrap(), tag);
        }
        assert!("youtube".parse::<SourceTag>().is_err());
    }

    #[test]
    fn test_source_tag_serde_uses_snake_case() {
        let json = serde_json::to_string(&SourceTag::AudioId).unwrap();
        assert_eq!(json, "\"audio_id\"");
    }

    #[test]
    fn test_empty_update() {
        assert!(EntryUpdate::default().is_empty());
        let update = EntryUpdate {
            source_tag: Some(SourceTag::Manual),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
