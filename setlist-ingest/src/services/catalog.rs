//! Catalog linking
//!
//! Resolves artist/track names on new tracklist entries to catalog rows,
//! creating rows on first sight. The name-keyed index lives inside one
//! [`Catalog`] instance; tests build their own.

use serde::Serialize;
use setlist_common::text::{generate_slug, is_placeholder_name, normalize_text, tidy_artist_name};
use setlist_common::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::CatalogStore;

/// Catalog references for one entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogLink {
    pub artist_id: Option<Uuid>,
    pub track_id: Option<Uuid>,
}

#[derive(Default)]
struct CatalogIndex {
    /// slug → artist id
    artists: HashMap<String, Uuid>,
    /// (artist id, normalized title) → track id
    tracks: HashMap<(Option<Uuid>, String), Uuid>,
}

/// Artist/track resolver with an in-memory name index
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
    index: Mutex<CatalogIndex>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            index: Mutex::new(CatalogIndex::default()),
        }
    }

    /// Resolve (or create) the artist and track for an entry
    ///
    /// Placeholder names stay unlinked. A linked track counts one play; a
    /// failed play count is logged and the link is still returned.
    pub async fn link(&self, artist_name: &str, track_title: &str) -> Result<CatalogLink> {
        // Held across lookups so two links of the same new name cannot both create it
        let mut index = self.index.lock().await;

        let artist_id = self.resolve_artist(&mut index, artist_name).await?;
        let track_id = self
            .resolve_track(&mut index, track_title, artist_name, artist_id)
            .await?;

        if let Some(track_id) = track_id {
            if let Err(e) = self.store.record_play(track_id).await {
                warn!(track_id = %track_id, error = %e, "Failed to count track play");
            }
        }

        Ok(CatalogLink { artist_id, track_id })
    }

    /// Drop every cached name; the next lookups go to storage
    ///
    /// Needed after the Offline Deduplicator deletes rows.
    pub async fn clear_index(&self) {
        let mut index = self.index.lock().await;
        index.artists.clear();
        index.tracks.clear();
    }

    async fn resolve_artist(&self, index: &mut CatalogIndex, name: &str) -> Result<Option<Uuid>> {
        if is_placeholder_name(name) {
            return Ok(None);
        }
        let slug = generate_slug(name);
        if slug.is_empty() {
            return Ok(None);
        }
        if let Some(id) = index.artists.get(&slug) {
            return Ok(Some(*id));
        }

        let artist = match self.store.find_artist(name).await? {
            Some(artist) => artist,
            None => {
                let artist = self.store.create_artist(&tidy_artist_name(name)).await?;
                debug!(artist_id = %artist.id, name = %artist.name, "Catalog artist created");
                artist
            }
        };
        index.artists.insert(slug, artist.id);
        Ok(Some(artist.id))
    }

    async fn resolve_track(
        &self,
        index: &mut CatalogIndex,
        title: &str,
        artist_name: &str,
        artist_id: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        if is_placeholder_name(title) {
            return Ok(None);
        }
        let key = (artist_id, normalize_text(title));
        if let Some(id) = index.tracks.get(&key) {
            return Ok(Some(*id));
        }

        let track = match self.store.find_track(title, artist_id).await? {
            Some(track) => track,
            None => {
                let track = self.store.create_track(title, artist_name, artist_id).await?;
                debug!(track_id = %track.id, title = %track.title, "Catalog track created");
                track
            }
        };
        index.tracks.insert(key, track.id);
        Ok(Some(track.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use setlist_common::db::init_memory_database;

    async fn catalog() -> (Catalog, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::new(init_memory_database().await.unwrap()));
        (Catalog::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_link_creates_then_reuses() {
        let (catalog, store) = catalog().await;

        let first = catalog.link("Daft Punk", "One More Time").await.unwrap();
        let second = catalog.link("daft punk", "One More Time!").await.unwrap();
        assert!(first.artist_id.is_some());
        assert!(first.track_id.is_some());
        assert_eq!(first, second);

        let tracks = store.list_tracks().await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].times_played, 2);
    }

    #[tokio::test]
    async fn test_placeholders_stay_unlinked() {
        let (catalog, store) = catalog().await;

        let link = catalog.link("Luke Dean", "ID").await.unwrap();
        assert!(link.artist_id.is_some());
        assert!(link.track_id.is_none());

        let link = catalog.link("Unknown", "ID").await.unwrap();
        assert_eq!(link, CatalogLink::default());
        assert_eq!(store.list_artists().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_artist_names_are_tidied() {
        let (catalog, store) = catalog().await;
        catalog.link("CHRIS STUSSY", "Desire").await.unwrap();
        let artists = store.list_artists().await.unwrap();
        assert_eq!(artists[0].name, "Chris Stussy");
    }

    #[tokio::test]
    async fn test_play_count_failure_keeps_link() {
        let (catalog, store) = catalog().await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_plays BEFORE UPDATE OF times_played ON tracks
            BEGIN SELECT RAISE(ABORT, 'plays are read-only'); END
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();

        let link = catalog.link("Floating Points", "Silhouettes").await.unwrap();
        assert!(link.artist_id.is_some());
        let tracks = store.list_tracks().await.unwrap();
        assert_eq!(link.track_id, Some(tracks[0].id));
        assert_eq!(tracks[0].times_played, 0);
    }

    #[tokio::test]
    async fn test_cleared_index_falls_back_to_storage() {
        let (catalog, _store) = catalog().await;
        let first = catalog.link("Derrick May", "Strings of Life").await.unwrap();
        catalog.clear_index().await;
        let second = catalog.link("Derrick May", "Strings of Life").await.unwrap();
        assert_eq!(first, second);
    }
}
