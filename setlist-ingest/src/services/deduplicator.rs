//! Offline Deduplicator
//!
//! Batch job over the global catalog. Groups artists (and, per artist,
//! tracks) whose names are more similar than the configured threshold,
//! keeps the most complete row of each group and merges the rest into it.
//! Performances scraped twice (same external id, or same name and artist)
//! are collapsed onto the copy with the most entries. Every merge is one
//! self-contained storage unit, so the job can be interrupted and simply
//! run again.
//!
//! Follow-up steps after merging:
//! 1. repair stale normalized titles and missing artist slugs
//! 2. unlink entries/tracks whose catalog reference no longer exists
//! 3. tidy artist display names
//! 4. recompute every performance's stored track count

use serde::Serialize;
use setlist_common::models::{CatalogArtist, CatalogTrack, PerformanceRecord};
use setlist_common::text::{generate_slug, normalize_text, tidy_artist_name};
use setlist_common::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use tracing::{debug, info};

use super::catalog::Catalog;
use crate::db::CatalogStore;
use crate::matching::similarity;

/// Default name similarity above which two catalog rows are the same entity
pub const DEFAULT_DEDUP_SIMILARITY_THRESHOLD: f64 = 0.85;

const VERIFIED_BONUS: u64 = 10_000;
const IMAGE_BONUS: u64 = 100;
const EXTERNAL_URL_BONUS: u64 = 50;
const LABEL_BONUS: u64 = 25;
const BPM_BONUS: u64 = 25;

/// Counters from one deduplication run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub artist_groups: u64,
    pub artists_merged: u64,
    pub track_groups: u64,
    pub tracks_merged: u64,
    pub performance_groups: u64,
    pub performances_merged: u64,
    pub titles_renormalized: u64,
    pub slugs_fixed: u64,
    pub orphans_unlinked: u64,
    pub artists_renamed: u64,
    pub performances_recounted: u64,
    pub dry_run: bool,
}

/// Catalog row that can be grouped and ranked
trait Dedupable {
    fn name(&self) -> &str;
    fn completeness(&self) -> u64;
    /// Rows with different scopes are never grouped
    fn scope(&self) -> String {
        String::new()
    }
}

impl Dedupable for CatalogArtist {
    fn name(&self) -> &str {
        &self.name
    }

    fn completeness(&self) -> u64 {
        let mut score = self.reference_count;
        if self.verified {
            score += VERIFIED_BONUS;
        }
        if has_text(&self.image_url) {
            score += IMAGE_BONUS;
        }
        if has_text(&self.external_url) {
            score += EXTERNAL_URL_BONUS;
        }
        score
    }
}

impl Dedupable for CatalogTrack {
    fn name(&self) -> &str {
        &self.title
    }

    fn completeness(&self) -> u64 {
        let mut score = self.reference_count;
        if self.verified {
            score += VERIFIED_BONUS;
        }
        if has_text(&self.external_url) {
            score += EXTERNAL_URL_BONUS;
        }
        if has_text(&self.label) {
            score += LABEL_BONUS;
        }
        if self.bpm.is_some_and(|bpm| bpm > 0.0) {
            score += BPM_BONUS;
        }
        score
    }

    fn scope(&self) -> String {
        normalize_text(&self.artist_name)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// A keeper and the rows to fold into it
struct Group<T> {
    keeper: T,
    losers: Vec<T>,
}

/// Greedy single-pass clustering: each unassigned row seeds a group and
/// absorbs every later unassigned row in its scope above the threshold.
fn group_similar<T: Dedupable + Clone>(rows: &[T], threshold: f64) -> Vec<Group<T>> {
    let mut assigned = vec![false; rows.len()];
    let mut groups = Vec::new();

    for i in 0..rows.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let scope = rows[i].scope();
        let mut members = vec![rows[i].clone()];

        for j in (i + 1)..rows.len() {
            if assigned[j] || rows[j].scope() != scope {
                continue;
            }
            if similarity(rows[i].name(), rows[j].name()) > threshold {
                assigned[j] = true;
                members.push(rows[j].clone());
            }
        }

        if members.len() < 2 {
            continue;
        }

        // First row wins ties
        let keeper_index = members
            .iter()
            .enumerate()
            .fold(0, |best, (idx, row)| {
                if row.completeness() > members[best].completeness() {
                    idx
                } else {
                    best
                }
            });
        let keeper = members.remove(keeper_index);
        groups.push(Group { keeper, losers: members });
    }

    groups
}

/// Groups of performances that are the same recording
///
/// External-id groups come first, then groups on normalized name plus
/// artist. A row already folded into an earlier keeper is not grouped again.
fn group_performances(rows: &[PerformanceRecord]) -> Vec<Group<PerformanceRecord>> {
    let mut keys: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<usize>> = HashMap::new();
    let mut add = |key: String, index: usize| {
        if !members.contains_key(&key) {
            keys.push(key.clone());
        }
        members.entry(key).or_default().push(index);
    };

    for (index, row) in rows.iter().enumerate() {
        if let Some(external_id) = row.external_id.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            add(format!("external:{}", external_id), index);
        }
    }
    for (index, row) in rows.iter().enumerate() {
        let name = normalize_text(row.name.as_deref().unwrap_or_default());
        if !name.is_empty() {
            let artist = normalize_text(row.artist_name.as_deref().unwrap_or_default());
            add(format!("name:{}|{}", name, artist), index);
        }
    }

    let mut folded: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();
    for key in keys {
        let indexes: Vec<usize> = members
            .remove(&key)
            .unwrap_or_default()
            .into_iter()
            .filter(|i| !folded.contains(i))
            .collect();
        if indexes.len() < 2 {
            continue;
        }

        // First row wins ties
        let keeper_index = indexes
            .iter()
            .copied()
            .fold(indexes[0], |best, i| if rows[i].entry_count > rows[best].entry_count { i } else { best });
        let losers: Vec<PerformanceRecord> = indexes
            .iter()
            .copied()
            .filter(|i| *i != keeper_index)
            .map(|i| rows[i].clone())
            .collect();
        folded.extend(indexes.iter().copied().filter(|i| *i != keeper_index));
        groups.push(Group {
            keeper: rows[keeper_index].clone(),
            losers,
        });
    }

    groups
}

/// Offline Deduplicator
pub struct OfflineDeduplicator {
    store: Arc<dyn CatalogStore>,
    catalog: Option<Arc<Catalog>>,
    similarity_threshold: f64,
}

impl OfflineDeduplicator {
    pub fn new(store: Arc<dyn CatalogStore>, similarity_threshold: f64) -> Self {
        Self {
            store,
            catalog: None,
            similarity_threshold,
        }
    }

    /// Catalog whose name index is cleared after a run
    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub async fn run(&self, dry_run: bool) -> Result<DedupReport> {
        let mut report = DedupReport {
            dry_run,
            ..Default::default()
        };

        let artists = self.store.list_artists().await?;
        for group in group_similar(&artists, self.similarity_threshold) {
            report.artist_groups += 1;
            info!(
                keeper = %group.keeper.name,
                losers = ?group.losers.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
                dry_run,
                "Duplicate artist group"
            );
            if dry_run {
                continue;
            }
            for loser in &group.losers {
                self.store.merge_artist_into(loser, group.keeper.id).await?;
                report.artists_merged += 1;
                debug!(loser_id = %loser.id, keeper_id = %group.keeper.id, "Artist merged");
            }
        }

        let tracks = self.store.list_tracks().await?;
        for group in group_similar(&tracks, self.similarity_threshold) {
            report.track_groups += 1;
            info!(
                artist = %group.keeper.artist_name,
                keeper = %group.keeper.title,
                losers = ?group.losers.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
                dry_run,
                "Duplicate track group"
            );
            if dry_run {
                continue;
            }
            for loser in &group.losers {
                self.store.merge_track_into(loser, group.keeper.id).await?;
                report.tracks_merged += 1;
                debug!(loser_id = %loser.id, keeper_id = %group.keeper.id, "Track merged");
            }
        }

        let performances = self.store.list_performances().await?;
        for group in group_performances(&performances) {
            report.performance_groups += 1;
            info!(
                keeper = %group.keeper.id,
                name = ?group.keeper.name,
                losers = ?group.losers.iter().map(|p| p.id).collect::<Vec<Uuid>>(),
                dry_run,
                "Duplicate performance group"
            );
            if dry_run {
                continue;
            }
            for loser in &group.losers {
                let removed = self.store.discard_performance(loser.id).await?;
                report.performances_merged += 1;
                debug!(loser_id = %loser.id, keeper_id = %group.keeper.id, removed, "Performance merged");
            }
        }

        if dry_run {
            info!(?report, "Deduplication dry run complete");
            return Ok(report);
        }

        for track in self.store.list_tracks().await? {
            let expected = normalize_text(&track.title);
            if !expected.is_empty() && expected != track.title_normalized {
                self.store.set_track_title_normalized(track.id, &expected).await?;
                report.titles_renormalized += 1;
                debug!(track_id = %track.id, from = %track.title_normalized, to = %expected, "Title renormalized");
            }
        }

        for artist in self.store.list_artists().await? {
            if !artist.slug.trim().is_empty() {
                continue;
            }
            let slug = generate_slug(&artist.name);
            if !slug.is_empty() {
                self.store.set_artist_slug(artist.id, &slug).await?;
                report.slugs_fixed += 1;
                debug!(artist_id = %artist.id, slug = %slug, "Artist slug restored");
            }
        }

        report.orphans_unlinked = self.store.unlink_orphans().await?;

        for artist in self.store.list_artists().await? {
            let tidy = tidy_artist_name(&artist.name);
            if !tidy.is_empty() && tidy != artist.name {
                self.store.rename_artist(artist.id, &tidy).await?;
                report.artists_renamed += 1;
                debug!(artist_id = %artist.id, from = %artist.name, to = %tidy, "Artist renamed");
            }
        }

        report.performances_recounted = self.store.recount_performances().await?;

        if let Some(catalog) = &self.catalog {
            catalog.clear_index().await;
        }

        info!(?report, "Deduplication complete");
        Ok(report)
    }
}
