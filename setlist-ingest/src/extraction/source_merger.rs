//! Cross-Source Merger
//!
//! Combines candidates from several blobs of one performance into a single
//! ordered list. Blobs are ranked first; candidates from lower-ranked blobs
//! are dropped when a kept candidate already sits within the time window.

use std::cmp::Reverse;
use tracing::{debug, trace};

use super::candidate_assembler::{CandidateAssembler, FULL_TRACKLIST_MIN_STAMPS};
use super::timestamp_scanner::scan_timestamps;
use super::types::{SourceBlob, TrackCandidate};
use setlist_common::text::normalize_text;

/// Default time-proximity window in seconds
pub const DEFAULT_WINDOW_SECONDS: u32 = 30;

/// Merges candidates across source blobs
#[derive(Debug, Clone)]
pub struct CrossSourceMerger {
    window_seconds: u32,
}

impl Default for CrossSourceMerger {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS)
    }
}

impl CrossSourceMerger {
    pub fn new(window_seconds: u32) -> Self {
        Self { window_seconds }
    }

    pub fn window_seconds(&self) -> u32 {
        self.window_seconds
    }

    /// Order blobs by expected quality
    ///
    /// Full tracklists (5+ time codes) first, then authoritative kinds, then
    /// endorsement weight descending. The sort is stable, so equal blobs keep
    /// their input order.
    pub fn rank_blobs<'a>(&self, blobs: &'a [SourceBlob]) -> Vec<&'a SourceBlob> {
        let mut ranked: Vec<(usize, &SourceBlob)> = blobs
            .iter()
            .map(|blob| (scan_timestamps(&blob.text).len(), blob))
            .collect();
        ranked.sort_by_key(|(stamps, blob)| {
            (
                *stamps < FULL_TRACKLIST_MIN_STAMPS,
                !blob.kind.is_authoritative(),
                Reverse(blob.weight),
            )
        });
        ranked.into_iter().map(|(_, blob)| blob).collect()
    }

    /// Assemble and merge every blob into one ordered candidate list
    pub fn merge_blobs(&self, assembler: &CandidateAssembler, blobs: &[SourceBlob]) -> Vec<TrackCandidate> {
        let merged = self
            .rank_blobs(blobs)
            .into_iter()
            .map(|blob| assembler.assemble(blob))
            .fold(Vec::new(), |kept, next| self.merge(kept, next));

        debug!(
            blobs = blobs.len(),
            candidates = merged.len(),
            window_seconds = self.window_seconds,
            "Sources merged"
        );
        merged
    }

    /// Merge a secondary candidate list into an already-kept primary list
    ///
    /// - A timed secondary candidate is dropped when any kept timed
    ///   candidate lies within the window.
    /// - An untimed secondary candidate is dropped when a kept candidate
    ///   names the same track.
    ///
    /// Result is sorted by timestamp, untimed candidates last.
    pub fn merge(&self, primary: Vec<TrackCandidate>, secondary: Vec<TrackCandidate>) -> Vec<TrackCandidate> {
        let mut kept = primary;

        for candidate in secondary {
            let conflict = if candidate.is_timed() {
                kept.iter().any(|k| {
                    k.is_timed() && k.timestamp_seconds.abs_diff(candidate.timestamp_seconds) <= self.window_seconds
                })
            } else {
                let identity = identity_key(&candidate);
                kept.iter().any(|k| identity_key(k) == identity)
            };

            if conflict {
                trace!(
                    seconds = candidate.timestamp_seconds,
                    title = %candidate.title,
                    "Secondary candidate dropped"
                );
                continue;
            }
            kept.push(candidate);
        }

        kept.sort_by_key(|c| (!c.is_timed(), c.timestamp_seconds));
        kept
    }
}

fn identity_key(candidate: &TrackCandidate) -> (String, String) {
    (normalize_text(&candidate.artist), normalize_text(&candidate.title))
}
