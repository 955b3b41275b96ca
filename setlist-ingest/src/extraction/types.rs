//! Extraction inputs and outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use setlist_common::SourceTag;

/// Where a text blob came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The performance's own description (authoritative)
    Description,
    /// Audience comment
    Comment,
    /// Curated tracklist page text
    Tracklist,
    /// Any other scraped page text
    PageText,
}

impl SourceKind {
    /// Authoritative sources win every timestamp-window conflict
    pub fn is_authoritative(self) -> bool {
        matches!(self, Self::Description | Self::Tracklist)
    }

    /// Trust rank entries imported from this source receive
    pub fn source_tag(self) -> SourceTag {
        match self {
            Self::Description => SourceTag::Description,
            Self::Tracklist => SourceTag::Tracklist,
            Self::Comment | Self::PageText => SourceTag::Comment,
        }
    }
}

/// Raw text supplied by the scraping collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBlob {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Endorsement count (likes, upvotes)
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub kind: SourceKind,
}

impl SourceBlob {
    pub fn new(kind: SourceKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: None,
            weight: 0,
            published_at: None,
            kind,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Unverified guess at one track mention
///
/// Transient: created per extraction pass and discarded after
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCandidate {
    pub source_text: String,
    /// 0 = untimed
    pub timestamp_seconds: u32,
    pub timestamp_formatted: Option<String>,
    pub title: String,
    pub artist: String,
    pub extras: Vec<String>,
    pub confidence: f64,
    pub source_author: Option<String>,
    pub source_weight: u32,
    pub is_unreleased_hint: bool,
}

impl TrackCandidate {
    pub fn is_timed(&self) -> bool {
        self.timestamp_seconds > 0
    }
}
