//! Database initialization
//!
//! Creates the database file on first run, applies pragmas and creates the
//! schema idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Identity-match acceptance threshold
pub const SETTING_MATCH_THRESHOLD: &str = "match_threshold";
/// Near-duplicate suppression threshold
pub const SETTING_NEAR_DUPLICATE_THRESHOLD: &str = "near_duplicate_threshold";
/// Cross-source merge window in seconds
pub const SETTING_MERGE_WINDOW_SECONDS: &str = "merge_window_seconds";
/// Offline deduplicator name-similarity threshold
pub const SETTING_DEDUP_SIMILARITY_THRESHOLD: &str = "dedup_similarity_threshold";

/// Built-in defaults written on first start
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (SETTING_MATCH_THRESHOLD, "0.6"),
    (SETTING_NEAR_DUPLICATE_THRESHOLD, "0.5"),
    (SETTING_MERGE_WINDOW_SECONDS, "30"),
    (SETTING_DEDUP_SIMILARITY_THRESHOLD, "0.85"),
];

/// Open (creating if needed) the database file and initialize the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with schema (tests, dry runs)
pub async fn init_memory_database() -> Result<SqlitePool> {
    // One connection: every pooled connection would otherwise get its own
    // private in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and seed default settings (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_settings_table(pool).await?;
    create_performances_table(pool).await?;
    create_artists_table(pool).await?;
    create_tracks_table(pool).await?;
    create_alias_tables(pool).await?;
    create_tracklist_entries_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_performances_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performances (
            id TEXT PRIMARY KEY,
            name TEXT,
            artist_name TEXT,
            external_id TEXT,
            cover_art_url TEXT,
            tracks_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            image_url TEXT,
            external_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_artists_slug ON artists(slug)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tracks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            title_normalized TEXT NOT NULL,
            artist_id TEXT REFERENCES artists(id) ON DELETE SET NULL,
            artist_name TEXT NOT NULL,
            label TEXT,
            bpm REAL,
            external_url TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            times_played INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_title_normalized ON tracks(title_normalized)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_alias_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist_id TEXT NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
            alias TEXT NOT NULL,
            alias_lower TEXT NOT NULL,
            UNIQUE(artist_id, alias_lower)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track_aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            track_id TEXT NOT NULL REFERENCES tracks(id) ON DELETE CASCADE,
            title_alias TEXT NOT NULL,
            title_alias_normalized TEXT NOT NULL,
            UNIQUE(track_id, title_alias_normalized)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tracklist_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracklist_entries (
            id TEXT PRIMARY KEY,
            performance_id TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 1),
            artist_name TEXT NOT NULL,
            track_title TEXT NOT NULL,
            timestamp_seconds INTEGER NOT NULL DEFAULT 0 CHECK (timestamp_seconds >= 0),
            timestamp_formatted TEXT,
            source_tag TEXT NOT NULL,
            is_unreleased INTEGER NOT NULL DEFAULT 0,
            unreleased_reason TEXT,
            external_match_payload TEXT,
            track_id TEXT REFERENCES tracks(id) ON DELETE SET NULL,
            artist_id TEXT REFERENCES artists(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_entries_performance ON tracklist_entries(performance_id, position)",
    )
    .execute(pool)
    .await?;

    // At most one entry per confirmed time code within a performance
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_performance_timestamp
        ON tracklist_entries(performance_id, timestamp_seconds)
        WHERE timestamp_seconds > 0
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed default runtime settings; NULL values are reset to defaults
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        crate::db::settings::ensure_setting(pool, key, value).await?;
    }
    Ok(())
}
