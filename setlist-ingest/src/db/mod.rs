//! Storage access for the ingest service
//!
//! The pipeline talks to storage only through two traits:
//! - [`TracklistStore`]: per-performance entry reads/writes used by the
//!   Reconciliation Engine. Only row-level atomicity is assumed.
//! - [`CatalogStore`]: global artist/track catalog used by catalog linking
//!   and the Offline Deduplicator.
//!
//! [`SqliteStore`] implements both on the shared SQLite pool.

pub mod catalog;
pub mod entries;

use async_trait::async_trait;
use setlist_common::models::{CatalogArtist, CatalogTrack, PerformanceRecord};
use setlist_common::{CanonicalTrackEntry, EntryUpdate, Error, NewTrackEntry, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Tracklist entry storage
#[async_trait]
pub trait TracklistStore: Send + Sync {
    /// All entries of a performance, ordered by position
    async fn entries_for_performance(&self, performance_id: Uuid) -> Result<Vec<CanonicalTrackEntry>>;

    /// Insert one entry; storage assigns the id
    async fn insert_entry(&self, entry: &NewTrackEntry) -> Result<CanonicalTrackEntry>;

    /// Apply an additive update to one entry
    async fn update_entry_fields(&self, entry_id: Uuid, update: &EntryUpdate) -> Result<()>;

    /// Fresh row count for a performance
    async fn count_entries(&self, performance_id: Uuid) -> Result<u64>;

    /// Store the displayed track count on the performance record
    async fn record_track_count(&self, performance_id: Uuid, count: u64) -> Result<()>;

    /// Set cover art unless one is already stored; true when written
    async fn set_cover_art_if_absent(&self, performance_id: Uuid, url: &str) -> Result<bool>;
}

/// Global catalog storage
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up an artist by slug, then case-insensitive name, then alias
    async fn find_artist(&self, name: &str) -> Result<Option<CatalogArtist>>;

    async fn create_artist(&self, name: &str) -> Result<CatalogArtist>;

    /// Look up a track by normalized title (then title alias) for one artist
    async fn find_track(&self, title: &str, artist_id: Option<Uuid>) -> Result<Option<CatalogTrack>>;

    async fn create_track(&self, title: &str, artist_name: &str, artist_id: Option<Uuid>) -> Result<CatalogTrack>;

    /// Count one more appearance of a track in a tracklist
    async fn record_play(&self, track_id: Uuid) -> Result<()>;

    /// Every artist with its reference count
    async fn list_artists(&self) -> Result<Vec<CatalogArtist>>;

    /// Every track with its reference count
    async fn list_tracks(&self) -> Result<Vec<CatalogTrack>>;

    /// Re-point references from `loser` to `keeper_id` (tracks also take
    /// the keeper's name), keep the loser's name as an alias, delete the
    /// loser. One atomic, repeatable unit.
    async fn merge_artist_into(&self, loser: &CatalogArtist, keeper_id: Uuid) -> Result<()>;

    /// Track counterpart of [`CatalogStore::merge_artist_into`]; blank keeper
    /// fields are filled from the loser and play counts are summed.
    async fn merge_track_into(&self, loser: &CatalogTrack, keeper_id: Uuid) -> Result<()>;

    /// Every performance with its entry count
    async fn list_performances(&self) -> Result<Vec<PerformanceRecord>>;

    /// Delete a duplicate performance and its entries in one unit; returns
    /// the number of entries removed
    async fn discard_performance(&self, performance_id: Uuid) -> Result<u64>;

    async fn set_track_title_normalized(&self, track_id: Uuid, title_normalized: &str) -> Result<()>;

    async fn set_artist_slug(&self, artist_id: Uuid, slug: &str) -> Result<()>;

    /// Null out references to catalog rows that no longer exist
    async fn unlink_orphans(&self) -> Result<u64>;

    /// Rename an artist and regenerate its slug
    async fn rename_artist(&self, artist_id: Uuid, name: &str) -> Result<()>;

    /// Recompute every performance's stored track count from its entries
    async fn recount_performances(&self) -> Result<u64>;
}

/// SQLite implementation of both storage traits
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a UUID stored as TEXT
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}
