//! Reconciliation Engine
//!
//! Applies a batch of candidates to one performance's canonical tracklist
//! under an additive-only policy:
//!
//! - **Matched**: upgrade the source tag only when strictly more reliable;
//!   set the time code only when the entry has none. Identity fields are
//!   never written. An update with nothing to change is a "confirmation".
//! - **Unmatched**: suppressed when a near-duplicate exists; otherwise
//!   inserted at `max(position) + 1` if the candidate is timed or the
//!   performance had no entries when the batch started (bootstrap).
//!
//! Candidates are processed one at a time against a snapshot that is kept
//! in step with every write. A failed write is counted and the batch goes
//! on. Batches for the same performance are serialized in-process.

use serde::{Deserialize, Serialize};
use setlist_common::time::{format_timestamp, parse_timestamp};
use setlist_common::{CanonicalTrackEntry, EntryUpdate, Error, NewTrackEntry, Result, SourceTag};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::{Catalog, CatalogLink};
use super::oracle::IdentificationOracle;
use crate::db::TracklistStore;
use crate::extraction::TrackCandidate;
use crate::matching::{IdentityMatcher, MatchVerdict, TrackIdentity};

/// Reason tag stored on entries flagged unreleased by the source text
pub const UNRELEASED_REASON_SOURCE_HINT: &str = "source_hint";

/// Time code as supplied by the caller
///
/// Accepts a number of seconds, an object (`{"seconds": 90}` or
/// `{"hours": 1, "minutes": 5, "seconds": 30}`), or text such as `"1:05:30"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateTimestamp {
    Seconds(f64),
    Object {
        #[serde(default)]
        hours: u32,
        #[serde(default)]
        minutes: u32,
        #[serde(default)]
        seconds: u32,
        #[serde(default)]
        formatted: Option<String>,
    },
    Text(String),
}

impl CandidateTimestamp {
    /// Seconds, 0 when unknown or unparseable
    pub fn seconds(&self) -> u32 {
        match self {
            Self::Seconds(value) if value.is_finite() && *value > 0.0 => {
                value.round().min(f64::from(u32::MAX)) as u32
            }
            Self::Seconds(_) => 0,
            Self::Object {
                hours,
                minutes,
                seconds,
                ..
            } => hours
                .saturating_mul(3600)
                .saturating_add(minutes.saturating_mul(60))
                .saturating_add(*seconds),
            Self::Text(text) => parse_timestamp(text).unwrap_or(0),
        }
    }

    fn formatted(&self) -> Option<&str> {
        match self {
            Self::Object { formatted, .. } => formatted.as_deref(),
            Self::Text(text) => Some(text.trim()),
            Self::Seconds(_) => None,
        }
    }
}

/// One candidate in an import batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCandidate {
    pub title: String,
    pub artist: String,
    #[serde(default, alias = "timestampObject")]
    pub timestamp_seconds: Option<CandidateTimestamp>,
    #[serde(default)]
    pub timestamp_formatted: Option<String>,
    #[serde(default)]
    pub is_unreleased_hint: bool,
}

impl ImportCandidate {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, seconds: u32) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            timestamp_seconds: (seconds > 0).then(|| CandidateTimestamp::Seconds(f64::from(seconds))),
            timestamp_formatted: None,
            is_unreleased_hint: false,
        }
    }

    pub fn seconds(&self) -> u32 {
        self.timestamp_seconds.as_ref().map(CandidateTimestamp::seconds).unwrap_or(0)
    }

    /// Display form of the time code, `None` when untimed
    pub fn formatted(&self) -> Option<String> {
        let seconds = self.seconds();
        if seconds == 0 {
            return None;
        }
        self.timestamp_formatted
            .as_deref()
            .or_else(|| self.timestamp_seconds.as_ref().and_then(CandidateTimestamp::formatted))
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .or_else(|| Some(format_timestamp(seconds)))
    }
}

impl TrackIdentity for ImportCandidate {
    fn title(&self) -> &str {
        &self.title
    }

    fn artist(&self) -> &str {
        &self.artist
    }
}

impl From<TrackCandidate> for ImportCandidate {
    fn from(candidate: TrackCandidate) -> Self {
        Self {
            timestamp_seconds: candidate
                .is_timed()
                .then(|| CandidateTimestamp::Seconds(f64::from(candidate.timestamp_seconds))),
            timestamp_formatted: candidate.timestamp_formatted,
            title: candidate.title,
            artist: candidate.artist,
            is_unreleased_hint: candidate.is_unreleased_hint,
        }
    }
}

/// Batch import request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default)]
    pub performance_id: Option<Uuid>,
    #[serde(default)]
    pub candidates: Vec<ImportCandidate>,
    #[serde(default = "default_source_tag")]
    pub source_tag: SourceTag,
    #[serde(default)]
    pub cover_art_url: Option<String>,
}

fn default_source_tag() -> SourceTag {
    SourceTag::Comment
}

/// Batch import result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub updated_count: u64,
    pub confirmed_count: u64,
    pub inserted_count: u64,
    pub error_count: u64,
    /// Entry count before the batch
    pub existing_count: u64,
    /// Fresh entry count after the batch
    pub final_count: u64,
    pub skipped_count: u64,
}

/// Why an unmatched candidate was not inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Blank,
    NearDuplicate,
    Untimed,
    TimestampTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Updated,
    Confirmed,
    Inserted,
    Skipped(SkipReason),
}

impl ImportSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Updated => self.updated_count += 1,
            Outcome::Confirmed => self.confirmed_count += 1,
            Outcome::Inserted => self.inserted_count += 1,
            Outcome::Skipped(_) => self.skipped_count += 1,
        }
    }
}

/// Reconciliation Engine
pub struct Reconciler {
    store: Arc<dyn TracklistStore>,
    matcher: IdentityMatcher,
    catalog: Option<Arc<Catalog>>,
    oracle: Option<Arc<dyn IdentificationOracle>>,
    /// Per-performance batch locks
    locks: LockTable,
}

impl Reconciler {
    pub fn new(store: Arc<dyn TracklistStore>, matcher: IdentityMatcher) -> Self {
        Self {
            store,
            matcher,
            catalog: None,
            oracle: None,
            locks: LockTable::default(),
        }
    }

    /// Link new entries to the catalog
    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Check new entries against an identification oracle
    pub fn with_oracle(mut self, oracle: Arc<dyn IdentificationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn matcher(&self) -> &IdentityMatcher {
        &self.matcher
    }

    /// Reconcile one batch
    ///
    /// Fails only on invalid input or when the existing entries (or the
    /// final count) cannot be read. Per-candidate write failures are
    /// counted in `error_count`.
    pub async fn import(&self, request: &ImportRequest) -> Result<ImportSummary> {
        let performance_id = request
            .performance_id
            .ok_or_else(|| Error::InvalidInput("performanceId is required".to_string()))?;
        if request.candidates.is_empty() {
            return Err(Error::InvalidInput("candidates must not be empty".to_string()));
        }

        let lease = self.locks.lease(performance_id);
        let _guard = lease.lock.lock().await;
        self.import_locked(performance_id, request).await
    }

    async fn import_locked(&self, performance_id: Uuid, request: &ImportRequest) -> Result<ImportSummary> {
        let mut entries = self.store.entries_for_performance(performance_id).await?;
        let existing_count = self.store.count_entries(performance_id).await?;
        let bootstrap = entries.is_empty();

        let mut summary = ImportSummary {
            existing_count,
            ..Default::default()
        };

        for candidate in &request.candidates {
            match self
                .apply_candidate(performance_id, candidate, request.source_tag, bootstrap, &mut entries)
                .await
            {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    warn!(
                        performance_id = %performance_id,
                        title = %candidate.title,
                        artist = %candidate.artist,
                        error = %e,
                        "Candidate write failed"
                    );
                    summary.error_count += 1;
                }
            }
        }

        summary.final_count = self.store.count_entries(performance_id).await?;

        if summary.final_count < summary.existing_count {
            warn!(
                performance_id = %performance_id,
                existing_count = summary.existing_count,
                final_count = summary.final_count,
                "Entry count dropped during import"
            );
        }

        if let Err(e) = self.store.record_track_count(performance_id, summary.final_count).await {
            warn!(performance_id = %performance_id, error = %e, "Failed to store track count");
        }

        if let Some(url) = request.cover_art_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            match self.store.set_cover_art_if_absent(performance_id, url).await {
                Ok(true) => debug!(performance_id = %performance_id, "Cover art set"),
                Ok(false) => {}
                Err(e) => warn!(performance_id = %performance_id, error = %e, "Failed to set cover art"),
            }
        }

        info!(
            performance_id = %performance_id,
            source_tag = %request.source_tag,
            updated = summary.updated_count,
            confirmed = summary.confirmed_count,
            inserted = summary.inserted_count,
            skipped = summary.skipped_count,
            errors = summary.error_count,
            existing = summary.existing_count,
            final_count = summary.final_count,
            "Import batch reconciled"
        );

        Ok(summary)
    }

    async fn apply_candidate(
        &self,
        performance_id: Uuid,
        candidate: &ImportCandidate,
        source_tag: SourceTag,
        bootstrap: bool,
        entries: &mut Vec<CanonicalTrackEntry>,
    ) -> Result<Outcome> {
        if candidate.title.trim().is_empty() && candidate.artist.trim().is_empty() {
            return Ok(Outcome::Skipped(SkipReason::Blank));
        }

        let seconds = candidate.seconds();

        match self.matcher.find_match(candidate, entries.as_slice()) {
            MatchVerdict::Matched(m) => {
                let entry = &entries[m.index];
                let mut update = EntryUpdate::default();

                if source_tag.outranks(entry.source_tag) {
                    update.source_tag = Some(source_tag);
                }
                if !entry.has_timestamp() && seconds > 0 && !timestamp_taken(entries, seconds) {
                    update.timestamp_seconds = Some(seconds);
                    update.timestamp_formatted = candidate.formatted();
                }

                if update.is_empty() {
                    debug!(
                        entry_id = %entry.id,
                        strategy = ?m.strategy,
                        score = m.score,
                        "Candidate confirmed"
                    );
                    return Ok(Outcome::Confirmed);
                }

                let entry_id = entry.id;
                self.store.update_entry_fields(entry_id, &update).await?;
                debug!(
                    entry_id = %entry_id,
                    strategy = ?m.strategy,
                    score = m.score,
                    source_tag = ?update.source_tag,
                    timestamp_seconds = ?update.timestamp_seconds,
                    "Entry updated"
                );

                let entry = &mut entries[m.index];
                if let Some(tag) = update.source_tag {
                    entry.source_tag = tag;
                }
                if let Some(seconds) = update.timestamp_seconds {
                    entry.timestamp_seconds = seconds;
                    entry.timestamp_formatted = update.timestamp_formatted;
                }
                Ok(Outcome::Updated)
            }
            MatchVerdict::NoMatch { best_score } => {
                if let Some(dup) = self.matcher.find_near_duplicate(candidate, entries.as_slice()) {
                    debug!(
                        title = %candidate.title,
                        duplicate_of = %entries[dup.index].id,
                        score = dup.score,
                        "Near-duplicate suppressed"
                    );
                    return Ok(Outcome::Skipped(SkipReason::NearDuplicate));
                }
                if seconds == 0 && !bootstrap {
                    debug!(title = %candidate.title, best_score, "Untimed candidate not inserted");
                    return Ok(Outcome::Skipped(SkipReason::Untimed));
                }
                if seconds > 0 && timestamp_taken(entries, seconds) {
                    debug!(title = %candidate.title, seconds, "Time code already taken");
                    return Ok(Outcome::Skipped(SkipReason::TimestampTaken));
                }

                let new_entry = self
                    .build_entry(performance_id, candidate, source_tag, seconds, entries)
                    .await;
                match self.store.insert_entry(&new_entry).await {
                    Ok(inserted) => {
                        debug!(
                            entry_id = %inserted.id,
                            position = inserted.position,
                            seconds,
                            "Entry inserted"
                        );
                        entries.push(inserted);
                        Ok(Outcome::Inserted)
                    }
                    Err(e) if is_unique_violation(&e) => {
                        debug!(title = %candidate.title, seconds, "Time code taken by a concurrent writer");
                        Ok(Outcome::Skipped(SkipReason::TimestampTaken))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// New entry with catalog links and oracle verdict attached
    async fn build_entry(
        &self,
        performance_id: Uuid,
        candidate: &ImportCandidate,
        source_tag: SourceTag,
        seconds: u32,
        entries: &[CanonicalTrackEntry],
    ) -> NewTrackEntry {
        let artist_name = candidate.artist.trim().to_string();
        let track_title = candidate.title.trim().to_string();

        let link = match &self.catalog {
            Some(catalog) => catalog.link(&artist_name, &track_title).await.unwrap_or_else(|e| {
                warn!(artist = %artist_name, title = %track_title, error = %e, "Catalog link failed");
                CatalogLink::default()
            }),
            None => CatalogLink::default(),
        };

        let mut is_unreleased = candidate.is_unreleased_hint;
        let mut external_match_payload = None;
        if let Some(oracle) = &self.oracle {
            match oracle.identify(&artist_name, &track_title).await {
                Ok(Some(verdict)) => {
                    if verdict.released {
                        is_unreleased = false;
                    }
                    external_match_payload = Some(verdict.payload);
                }
                Ok(None) => {}
                Err(e) => warn!(artist = %artist_name, title = %track_title, error = %e, "Oracle lookup failed"),
            }
        }

        let position = entries.iter().map(|e| e.position).max().unwrap_or(0) + 1;

        NewTrackEntry {
            performance_id,
            position,
            artist_name,
            track_title,
            timestamp_seconds: seconds,
            timestamp_formatted: candidate.formatted(),
            source_tag,
            is_unreleased,
            unreleased_reason: is_unreleased.then(|| UNRELEASED_REASON_SOURCE_HINT.to_string()),
            external_match_payload,
            track_id: link.track_id,
            artist_id: link.artist_id,
        }
    }

}

/// Batch locks keyed by performance
///
/// The table itself is only locked for map edits, never across an await.
#[derive(Default)]
struct LockTable {
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockTable {
    fn lease(&self, performance_id: Uuid) -> LockLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(performance_id).or_default().clone();
        LockLease {
            table: self,
            performance_id,
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Claim on one performance's lock; forgets the lock on drop once no other
/// batch holds or waits on it, including when the import is cancelled
struct LockLease<'a> {
    table: &'a LockTable,
    performance_id: Uuid,
    lock: Arc<Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.performance_id);
        }
    }
}

fn timestamp_taken(entries: &[CanonicalTrackEntry], seconds: u32) -> bool {
    seconds > 0 && entries.iter().any(|e| e.timestamp_seconds == seconds)
}

fn is_unique_violation(err: &Error) -> bool {
    matches!(err, Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation())
}
