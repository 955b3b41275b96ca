//! Catalog (artist/track) persistence
//!
//! Reference counts are computed on read. Merge operations run inside one
//! transaction each, so an interrupted deduplication pass leaves every
//! artist/track either fully merged or untouched.

use async_trait::async_trait;
use setlist_common::models::{CatalogArtist, CatalogTrack, PerformanceRecord};
use setlist_common::text::{generate_slug, normalize_text};
use setlist_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid, CatalogStore, SqliteStore};

const ARTIST_SELECT: &str = r#"
    SELECT a.id, a.name, a.slug, a.verified, a.image_url, a.external_url,
           (SELECT COUNT(*) FROM tracks t WHERE t.artist_id = a.id)
         + (SELECT COUNT(*) FROM tracklist_entries e WHERE e.artist_id = a.id) AS reference_count
    FROM artists a
"#;

const TRACK_SELECT: &str = r#"
    SELECT t.id, t.title, t.title_normalized, t.artist_id, t.artist_name, t.label, t.bpm,
           t.external_url, t.verified, t.times_played,
           (SELECT COUNT(*) FROM tracklist_entries e WHERE e.track_id = t.id) AS reference_count
    FROM tracks t
"#;

fn artist_from_row(row: &SqliteRow) -> Result<CatalogArtist> {
    let id: String = row.try_get("id")?;
    let reference_count: i64 = row.try_get("reference_count")?;
    Ok(CatalogArtist {
        id: parse_uuid(&id)?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        verified: row.try_get("verified")?,
        image_url: row.try_get("image_url")?,
        external_url: row.try_get("external_url")?,
        reference_count: reference_count.max(0) as u64,
    })
}

fn performance_from_row(row: &SqliteRow) -> Result<PerformanceRecord> {
    let id: String = row.try_get("id")?;
    let entry_count: i64 = row.try_get("entry_count")?;
    Ok(PerformanceRecord {
        id: parse_uuid(&id)?,
        name: row.try_get("name")?,
        artist_name: row.try_get("artist_name")?,
        external_id: row.try_get("external_id")?,
        entry_count: entry_count.max(0) as u64,
    })
}

fn track_from_row(row: &SqliteRow) -> Result<CatalogTrack> {
    let id: String = row.try_get("id")?;
    let reference_count: i64 = row.try_get("reference_count")?;
    Ok(CatalogTrack {
        id: parse_uuid(&id)?,
        title: row.try_get("title")?,
        title_normalized: row.try_get("title_normalized")?,
        artist_id: parse_optional_uuid(row.try_get("artist_id")?)?,
        artist_name: row.try_get("artist_name")?,
        label: row.try_get("label")?,
        bpm: row.try_get("bpm")?,
        external_url: row.try_get("external_url")?,
        verified: row.try_get("verified")?,
        times_played: row.try_get("times_played")?,
        reference_count: reference_count.max(0) as u64,
    })
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn find_artist(&self, name: &str) -> Result<Option<CatalogArtist>> {
        let slug = generate_slug(name);
        if slug.is_empty() {
            return Ok(None);
        }

        let by_slug = format!("{} WHERE a.slug = ? ORDER BY a.created_at, a.id LIMIT 1", ARTIST_SELECT);
        if let Some(row) = sqlx::query(&by_slug).bind(&slug).fetch_optional(self.pool()).await? {
            return artist_from_row(&row).map(Some);
        }

        let by_name = format!(
            "{} WHERE a.name = ? COLLATE NOCASE ORDER BY a.created_at, a.id LIMIT 1",
            ARTIST_SELECT
        );
        if let Some(row) = sqlx::query(&by_name).bind(name.trim()).fetch_optional(self.pool()).await? {
            return artist_from_row(&row).map(Some);
        }

        let by_alias = format!(
            "{} JOIN artist_aliases al ON al.artist_id = a.id WHERE al.alias_lower = ? LIMIT 1",
            ARTIST_SELECT
        );
        let row = sqlx::query(&by_alias)
            .bind(name.trim().to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(artist_from_row).transpose()
    }

    async fn create_artist(&self, name: &str) -> Result<CatalogArtist> {
        let name = name.trim();
        let slug = generate_slug(name);
        if slug.is_empty() {
            return Err(Error::InvalidInput(format!("Artist name has no usable characters: {:?}", name)));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO artists (id, name, slug, created_at, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&slug)
        .execute(self.pool())
        .await?;

        tracing::debug!(artist_id = %id, name = %name, "Created catalog artist");

        Ok(CatalogArtist {
            id,
            name: name.to_string(),
            slug,
            verified: false,
            image_url: None,
            external_url: None,
            reference_count: 0,
        })
    }

    async fn find_track(&self, title: &str, artist_id: Option<Uuid>) -> Result<Option<CatalogTrack>> {
        let normalized = normalize_text(title);
        if normalized.is_empty() {
            return Ok(None);
        }
        let artist_id = artist_id.map(|u| u.to_string());

        let by_title = format!(
            "{} WHERE t.title_normalized = ? AND t.artist_id IS ? ORDER BY t.created_at, t.id LIMIT 1",
            TRACK_SELECT
        );
        let row = sqlx::query(&by_title)
            .bind(&normalized)
            .bind(&artist_id)
            .fetch_optional(self.pool())
            .await?;
        if let Some(row) = row {
            return track_from_row(&row).map(Some);
        }

        let by_alias = format!(
            "{} JOIN track_aliases ta ON ta.track_id = t.id \
             WHERE ta.title_alias_normalized = ? AND t.artist_id IS ? LIMIT 1",
            TRACK_SELECT
        );
        let row = sqlx::query(&by_alias)
            .bind(&normalized)
            .bind(&artist_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(track_from_row).transpose()
    }

    async fn create_track(&self, title: &str, artist_name: &str, artist_id: Option<Uuid>) -> Result<CatalogTrack> {
        let title = title.trim();
        let title_normalized = normalize_text(title);
        if title_normalized.is_empty() {
            return Err(Error::InvalidInput(format!("Track title has no usable characters: {:?}", title)));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tracks (id, title, title_normalized, artist_id, artist_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(&title_normalized)
        .bind(artist_id.map(|u| u.to_string()))
        .bind(artist_name.trim())
        .execute(self.pool())
        .await?;

        tracing::debug!(track_id = %id, title = %title, "Created catalog track");

        Ok(CatalogTrack {
            id,
            title: title.to_string(),
            title_normalized,
            artist_id,
            artist_name: artist_name.trim().to_string(),
            label: None,
            bpm: None,
            external_url: None,
            verified: false,
            times_played: 0,
            reference_count: 0,
        })
    }

    async fn record_play(&self, track_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE tracks SET times_played = times_played + 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(track_id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn list_artists(&self) -> Result<Vec<CatalogArtist>> {
        let sql = format!("{} ORDER BY a.created_at, a.id", ARTIST_SELECT);
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;
        rows.iter().map(artist_from_row).collect()
    }

    async fn list_tracks(&self) -> Result<Vec<CatalogTrack>> {
        let sql = format!("{} ORDER BY t.created_at, t.id", TRACK_SELECT);
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;
        rows.iter().map(track_from_row).collect()
    }

    async fn merge_artist_into(&self, loser: &CatalogArtist, keeper_id: Uuid) -> Result<()> {
        if loser.id == keeper_id {
            return Ok(());
        }
        let loser_id = loser.id.to_string();
        let keeper = keeper_id.to_string();

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            UPDATE tracks SET
                artist_id = ?1,
                artist_name = COALESCE((SELECT name FROM artists WHERE id = ?1), artist_name),
                updated_at = CURRENT_TIMESTAMP
            WHERE artist_id = ?2
            "#,
        )
        .bind(&keeper)
        .bind(&loser_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE tracklist_entries SET artist_id = ?, updated_at = CURRENT_TIMESTAMP WHERE artist_id = ?",
        )
        .bind(&keeper)
        .bind(&loser_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE OR IGNORE artist_aliases SET artist_id = ? WHERE artist_id = ?")
            .bind(&keeper)
            .bind(&loser_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO artist_aliases (artist_id, alias, alias_lower) VALUES (?, ?, ?)")
            .bind(&keeper)
            .bind(&loser.name)
            .bind(loser.name.trim().to_lowercase())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM artists WHERE id = ?")
            .bind(&loser_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn merge_track_into(&self, loser: &CatalogTrack, keeper_id: Uuid) -> Result<()> {
        if loser.id == keeper_id {
            return Ok(());
        }
        let loser_id = loser.id.to_string();
        let keeper = keeper_id.to_string();

        let mut tx = self.pool().begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM tracks WHERE id = ?")
            .bind(&loser_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            // Already merged by an earlier, interrupted run
            tx.rollback().await?;
            return Ok(());
        }

        sqlx::query(
            "UPDATE tracklist_entries SET track_id = ?, updated_at = CURRENT_TIMESTAMP WHERE track_id = ?",
        )
        .bind(&keeper)
        .bind(&loser_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE tracks SET
                label = COALESCE(NULLIF(label, ''), ?),
                bpm = COALESCE(bpm, ?),
                external_url = COALESCE(NULLIF(external_url, ''), ?),
                verified = MAX(verified, ?),
                times_played = times_played + ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&loser.label)
        .bind(loser.bpm)
        .bind(&loser.external_url)
        .bind(loser.verified)
        .bind(loser.times_played)
        .bind(&keeper)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE OR IGNORE track_aliases SET track_id = ? WHERE track_id = ?")
            .bind(&keeper)
            .bind(&loser_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT OR IGNORE INTO track_aliases (track_id, title_alias, title_alias_normalized) VALUES (?, ?, ?)",
        )
        .bind(&keeper)
        .bind(&loser.title)
        .bind(&loser.title_normalized)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(&loser_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_performances(&self) -> Result<Vec<PerformanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.artist_name, p.external_id,
                   (SELECT COUNT(*) FROM tracklist_entries e WHERE e.performance_id = p.id) AS entry_count
            FROM performances p
            ORDER BY p.created_at, p.id
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(performance_from_row).collect()
    }

    async fn discard_performance(&self, performance_id: Uuid) -> Result<u64> {
        let id = performance_id.to_string();
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM tracklist_entries WHERE performance_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM performances WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn set_track_title_normalized(&self, track_id: Uuid, title_normalized: &str) -> Result<()> {
        sqlx::query("UPDATE tracks SET title_normalized = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(title_normalized)
            .bind(track_id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn set_artist_slug(&self, artist_id: Uuid, slug: &str) -> Result<()> {
        sqlx::query("UPDATE artists SET slug = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(slug)
            .bind(artist_id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn unlink_orphans(&self) -> Result<u64> {
        let mut unlinked = 0;
        for sql in [
            "UPDATE tracklist_entries SET track_id = NULL WHERE track_id IS NOT NULL AND track_id NOT IN (SELECT id FROM tracks)",
            "UPDATE tracklist_entries SET artist_id = NULL WHERE artist_id IS NOT NULL AND artist_id NOT IN (SELECT id FROM artists)",
            "UPDATE tracks SET artist_id = NULL WHERE artist_id IS NOT NULL AND artist_id NOT IN (SELECT id FROM artists)",
        ] {
            unlinked += sqlx::query(sql).execute(self.pool()).await?.rows_affected();
        }
        Ok(unlinked)
    }

    async fn rename_artist(&self, artist_id: Uuid, name: &str) -> Result<()> {
        sqlx::query("UPDATE artists SET name = ?, slug = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(name)
            .bind(generate_slug(name))
            .bind(artist_id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn recount_performances(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE performances SET
                tracks_count = (SELECT COUNT(*) FROM tracklist_entries e WHERE e.performance_id = performances.id),
                updated_at = CURRENT_TIMESTAMP
            WHERE tracks_count != (SELECT COUNT(*) FROM tracklist_entries e WHERE e.performance_id = performances.id)
            "#,
        )
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
