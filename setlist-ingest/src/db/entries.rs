//! Tracklist entry and performance persistence

use async_trait::async_trait;
use setlist_common::{CanonicalTrackEntry, EntryUpdate, Error, NewTrackEntry, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid, SqliteStore, TracklistStore};

const ENTRY_COLUMNS: &str = r#"
    id, performance_id, position, artist_name, track_title, timestamp_seconds,
    timestamp_formatted, source_tag, is_unreleased, unreleased_reason,
    external_match_payload, track_id, artist_id
"#;

fn entry_from_row(row: &SqliteRow) -> Result<CanonicalTrackEntry> {
    let id: String = row.try_get("id")?;
    let performance_id: String = row.try_get("performance_id")?;
    let position: i64 = row.try_get("position")?;
    let timestamp_seconds: i64 = row.try_get("timestamp_seconds")?;
    let source_tag: String = row.try_get("source_tag")?;
    let payload: Option<String> = row.try_get("external_match_payload")?;

    let external_match_payload: Option<serde_json::Value> = payload
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| Error::Internal(format!("Invalid match payload for entry {}: {}", id, e)))?;

    Ok(CanonicalTrackEntry {
        id: parse_uuid(&id)?,
        performance_id: parse_uuid(&performance_id)?,
        position: u32::try_from(position)
            .map_err(|_| Error::Internal(format!("Invalid position {} for entry {}", position, id)))?,
        artist_name: row.try_get("artist_name")?,
        track_title: row.try_get("track_title")?,
        timestamp_seconds: u32::try_from(timestamp_seconds).unwrap_or(0),
        timestamp_formatted: row.try_get("timestamp_formatted")?,
        source_tag: source_tag.parse()?,
        is_unreleased: row.try_get("is_unreleased")?,
        unreleased_reason: row.try_get("unreleased_reason")?,
        external_match_payload,
        track_id: parse_optional_uuid(row.try_get("track_id")?)?,
        artist_id: parse_optional_uuid(row.try_get("artist_id")?)?,
    })
}

#[async_trait]
impl TracklistStore for SqliteStore {
    async fn entries_for_performance(&self, performance_id: Uuid) -> Result<Vec<CanonicalTrackEntry>> {
        let sql = format!(
            "SELECT {} FROM tracklist_entries WHERE performance_id = ? ORDER BY position, timestamp_seconds",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(performance_id.to_string())
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn insert_entry(&self, entry: &NewTrackEntry) -> Result<CanonicalTrackEntry> {
        let id = Uuid::new_v4();
        let payload = entry
            .external_match_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Internal(format!("Serialize match payload failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO tracklist_entries (
                id, performance_id, position, artist_name, track_title, timestamp_seconds,
                timestamp_formatted, source_tag, is_unreleased, unreleased_reason,
                external_match_payload, track_id, artist_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(id.to_string())
        .bind(entry.performance_id.to_string())
        .bind(i64::from(entry.position))
        .bind(&entry.artist_name)
        .bind(&entry.track_title)
        .bind(i64::from(entry.timestamp_seconds))
        .bind(&entry.timestamp_formatted)
        .bind(entry.source_tag.as_str())
        .bind(entry.is_unreleased)
        .bind(&entry.unreleased_reason)
        .bind(payload)
        .bind(entry.track_id.map(|u| u.to_string()))
        .bind(entry.artist_id.map(|u| u.to_string()))
        .execute(self.pool())
        .await?;

        tracing::debug!(
            entry_id = %id,
            performance_id = %entry.performance_id,
            position = entry.position,
            "Inserted tracklist entry"
        );

        Ok(entry.clone().into_entry(id))
    }

    async fn update_entry_fields(&self, entry_id: Uuid, update: &EntryUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        // Time code is write-once: only a zero value may be replaced
        let result = sqlx::query(
            r#"
            UPDATE tracklist_entries SET
                source_tag = COALESCE(?, source_tag),
                timestamp_formatted = CASE
                    WHEN timestamp_seconds = 0 AND ? IS NOT NULL THEN ?
                    ELSE timestamp_formatted END,
                timestamp_seconds = CASE
                    WHEN timestamp_seconds = 0 AND ? IS NOT NULL THEN ?
                    ELSE timestamp_seconds END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(update.source_tag.map(|t| t.as_str()))
        .bind(update.timestamp_seconds.map(i64::from))
        .bind(&update.timestamp_formatted)
        .bind(update.timestamp_seconds.map(i64::from))
        .bind(update.timestamp_seconds.map(i64::from))
        .bind(entry_id.to_string())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Tracklist entry {}", entry_id)));
        }
        Ok(())
    }

    async fn count_entries(&self, performance_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracklist_entries WHERE performance_id = ?")
            .bind(performance_id.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn record_track_count(&self, performance_id: Uuid, count: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO performances (id, tracks_count) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET
                tracks_count = excluded.tracks_count,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(performance_id.to_string())
        .bind(i64::try_from(count).unwrap_or(i64::MAX))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_cover_art_if_absent(&self, performance_id: Uuid, url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO performances (id, cover_art_url) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET
                cover_art_url = excluded.cover_art_url,
                updated_at = CURRENT_TIMESTAMP
            WHERE performances.cover_art_url IS NULL OR performances.cover_art_url = ''
            "#,
        )
        .bind(performance_id.to_string())
        .bind(url)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Stored track count of a performance, if the performance exists
pub async fn stored_track_count(store: &SqliteStore, performance_id: Uuid) -> Result<Option<u64>> {
    let count: Option<i64> = sqlx::query_scalar("SELECT tracks_count FROM performances WHERE id = ?")
        .bind(performance_id.to_string())
        .fetch_optional(store.pool())
        .await?;
    Ok(count.map(|c| c.max(0) as u64))
}

/// Stored cover art of a performance
pub async fn stored_cover_art(store: &SqliteStore, performance_id: Uuid) -> Result<Option<String>> {
    let url: Option<Option<String>> = sqlx::query_scalar("SELECT cover_art_url FROM performances WHERE id = ?")
        .bind(performance_id.to_string())
        .fetch_optional(store.pool())
        .await?;
    Ok(url.flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_common::db::init_memory_database;
    use setlist_common::SourceTag;

    async fn store() -> SqliteStore {
        SqliteStore::new(init_memory_database().await.expect("in-memory database"))
    }

    fn new_entry(performance_id: Uuid, position: u32, seconds: u32) -> NewTrackEntry {
        NewTrackEntry {
            performance_id,
            position,
            artist_name: "Daft Punk".to_string(),
            track_title: format!("Track {}", position),
            timestamp_seconds: seconds,
            timestamp_formatted: None,
            source_tag: SourceTag::Comment,
            is_unreleased: false,
            unreleased_reason: None,
            external_match_payload: Some(serde_json::json!({"released": true})),
            track_id: None,
            artist_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = store().await;
        let performance_id = Uuid::new_v4();

        let inserted = store.insert_entry(&new_entry(performance_id, 2, 90)).await.unwrap();
        store.insert_entry(&new_entry(performance_id, 1, 30)).await.unwrap();

        let entries = store.entries_for_performance(performance_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[1], inserted);
        assert_eq!(store.count_entries(performance_id).await.unwrap(), 2);
        assert_eq!(store.count_entries(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_never_replaces_time_code() {
        let store = store().await;
        let performance_id = Uuid::new_v4();
        let untimed = store.insert_entry(&new_entry(performance_id, 1, 0)).await.unwrap();

        let set = EntryUpdate {
            source_tag: Some(SourceTag::Tracklist),
            timestamp_seconds: Some(120),
            timestamp_formatted: Some("2:00".to_string()),
        };
        store.update_entry_fields(untimed.id, &set).await.unwrap();

        let overwrite = EntryUpdate {
            timestamp_seconds: Some(999),
            timestamp_formatted: Some("16:39".to_string()),
            ..Default::default()
        };
        store.update_entry_fields(untimed.id, &overwrite).await.unwrap();

        let entries = store.entries_for_performance(performance_id).await.unwrap();
        assert_eq!(entries[0].timestamp_seconds, 120);
        assert_eq!(entries[0].timestamp_formatted.as_deref(), Some("2:00"));
        assert_eq!(entries[0].source_tag, SourceTag::Tracklist);
    }

    #[tokio::test]
    async fn test_update_missing_entry_is_not_found() {
        let store = store().await;
        let update = EntryUpdate {
            source_tag: Some(SourceTag::Manual),
            ..Default::default()
        };
        let err = store.update_entry_fields(Uuid::new_v4(), &update).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_performance_record_upserts() {
        let store = store().await;
        let performance_id = Uuid::new_v4();

        assert!(store.set_cover_art_if_absent(performance_id, "https://img/1.jpg").await.unwrap());
        assert!(!store.set_cover_art_if_absent(performance_id, "https://img/2.jpg").await.unwrap());
        assert_eq!(
            stored_cover_art(&store, performance_id).await.unwrap().as_deref(),
            Some("https://img/1.jpg")
        );

        store.record_track_count(performance_id, 7).await.unwrap();
        assert_eq!(stored_track_count(&store, performance_id).await.unwrap(), Some(7));
        assert_eq!(
            stored_cover_art(&store, performance_id).await.unwrap().as_deref(),
            Some("https://img/1.jpg"),
            "count update keeps cover art"
        );
    }
}
