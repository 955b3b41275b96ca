//! Database Test Utilities

use anyhow::Result;
use setlist_common::db::init_database;
use setlist_common::{CanonicalTrackEntry, NewTrackEntry, SourceTag};
use setlist_ingest::config::MatchSettings;
use setlist_ingest::db::{SqliteStore, TracklistStore};
use setlist_ingest::AppState;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Create temporary test database with schema and default settings
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_setlist.db");
    let pool = init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// App state over a fresh test database
pub async fn test_state() -> Result<(TempDir, AppState)> {
    let (temp_dir, pool) = create_test_db().await?;
    let settings = MatchSettings::load(&pool).await?;
    Ok((temp_dir, AppState::new(pool, settings)))
}

/// Insert one entry directly, bypassing reconciliation
pub async fn seed_entry(
    store: &SqliteStore,
    performance_id: Uuid,
    position: u32,
    artist: &str,
    title: &str,
    seconds: u32,
    source_tag: SourceTag,
) -> Result<CanonicalTrackEntry> {
    let entry = NewTrackEntry {
        performance_id,
        position,
        artist_name: artist.to_string(),
        track_title: title.to_string(),
        timestamp_seconds: seconds,
        timestamp_formatted: (seconds > 0).then(|| setlist_common::time::format_timestamp(seconds)),
        source_tag,
        is_unreleased: false,
        unreleased_reason: None,
        external_match_payload: None,
        track_id: None,
        artist_id: None,
    };
    Ok(store.insert_entry(&entry).await?)
}
