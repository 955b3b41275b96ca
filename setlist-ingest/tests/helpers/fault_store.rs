//! Fault-injecting storage wrapper

use async_trait::async_trait;
use setlist_common::{CanonicalTrackEntry, EntryUpdate, Error, NewTrackEntry, Result};
use setlist_ingest::db::{SqliteStore, TracklistStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Delegates to a real store, failing selected operations
pub struct FlakyStore {
    inner: SqliteStore,
    /// Inserts of these titles fail
    failing_titles: HashSet<String>,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            failing_titles: HashSet::new(),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_insert_of(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TracklistStore for FlakyStore {
    async fn entries_for_performance(&self, performance_id: Uuid) -> Result<Vec<CanonicalTrackEntry>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("injected read failure".to_string()));
        }
        self.inner.entries_for_performance(performance_id).await
    }

    async fn insert_entry(&self, entry: &NewTrackEntry) -> Result<CanonicalTrackEntry> {
        if self.failing_titles.contains(&entry.track_title) {
            return Err(Error::Internal(format!("injected insert failure: {}", entry.track_title)));
        }
        self.inner.insert_entry(entry).await
    }

    async fn update_entry_fields(&self, entry_id: Uuid, update: &EntryUpdate) -> Result<()> {
        self.inner.update_entry_fields(entry_id, update).await
    }

    async fn count_entries(&self, performance_id: Uuid) -> Result<u64> {
        self.inner.count_entries(performance_id).await
    }

    async fn record_track_count(&self, performance_id: Uuid, count: u64) -> Result<()> {
        self.inner.record_track_count(performance_id, count).await
    }

    async fn set_cover_art_if_absent(&self, performance_id: Uuid, url: &str) -> Result<bool> {
        self.inner.set_cover_art_if_absent(performance_id, url).await
    }
}
