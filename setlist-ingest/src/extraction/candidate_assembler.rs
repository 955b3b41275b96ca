//! Candidate Assembler
//!
//! Runs Scanner, Noise Filter and Mention Parser over one source blob and
//! produces scored [`TrackCandidate`]s.
//!
//! Two segmentation modes:
//! - **Line mode**: at least [`LINE_MODE_MIN_LINES`] lines carry a time code.
//!   Each timed line is parsed on its own (first time code on the line).
//! - **Slice mode**: otherwise the blob is cut between consecutive time-code
//!   offsets and each slice is parsed.
//!
//! Authoritative blobs (descriptions, tracklist pages) without any time code
//! still yield untimed candidates, one per line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace};

use super::mention_parser::{parse_mention, ParsedMention};
use super::noise_filter::check_fragment;
use super::timestamp_scanner::{scan_timestamps, TimestampMatch};
use super::types::{SourceBlob, TrackCandidate};

/// Timed lines needed before a blob is parsed line-by-line
pub const LINE_MODE_MIN_LINES: usize = 3;

/// Time codes in one blob that make it look like a full tracklist
pub const FULL_TRACKLIST_MIN_STAMPS: usize = 5;

const BASE_CONFIDENCE: f64 = 0.30;
const TIMED_BONUS: f64 = 0.20;
const FULL_TRACKLIST_BONUS: f64 = 0.20;
const AUTHOR_BONUS: f64 = 0.10;

/// (minimum exclusive weight, bonus), highest tier first
const WEIGHT_TIERS: &[(u32, f64)] = &[(100, 0.15), (50, 0.10), (10, 0.05)];

/// Author names containing one of these get the credibility bonus
const AUTHOR_KEYWORDS: &[&str] = &["tracklist", "track id", "trackid", "setlist", "1001"];

static TIME_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(?::[0-5]\d){1,2}\b").expect("valid regex"));

static EMPTY_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]\s*[\)\]]").expect("valid regex"));

static TRAILING_LINKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:at|@|around)$").expect("valid regex"));

static LEADING_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}[.)]\s+|#\d{1,3}[.)]?\s*)").expect("valid regex"));

/// Builds candidates from source blobs
#[derive(Debug, Clone, Default)]
pub struct CandidateAssembler;

impl CandidateAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Extract candidates from one blob
    ///
    /// Output is in blob order, deduplicated by
    /// (timestamp, lower(artist), lower(title)).
    pub fn assemble(&self, blob: &SourceBlob) -> Vec<TrackCandidate> {
        let stamps = scan_timestamps(&blob.text);
        let timed_lines = blob
            .text
            .lines()
            .filter(|line| !scan_timestamps(line).is_empty())
            .count();

        let mentions = if timed_lines >= LINE_MODE_MIN_LINES {
            trace!(timed_lines, "Assembling in line mode");
            self.line_mode(&blob.text)
        } else if !stamps.is_empty() {
            trace!(stamps = stamps.len(), "Assembling in slice mode");
            self.slice_mode(&blob.text, &stamps)
        } else if blob.kind.is_authoritative() {
            trace!("Assembling untimed lines from authoritative blob");
            self.untimed_mode(&blob.text)
        } else {
            Vec::new()
        };

        let blob_confidence = self.blob_confidence(blob, stamps.len());
        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(mentions.len());

        for (stamp, fragment, mention) in mentions {
            let (seconds, formatted) = match stamp {
                Some(s) => (s.seconds, Some(s.formatted)),
                None => (0, None),
            };
            let key = (seconds, mention.artist.to_lowercase(), mention.title.to_lowercase());
            if !seen.insert(key) {
                trace!(seconds, title = %mention.title, "Duplicate mention within blob");
                continue;
            }

            let timed_bonus = if seconds > 0 { TIMED_BONUS } else { 0.0 };
            candidates.push(TrackCandidate {
                source_text: fragment,
                timestamp_seconds: seconds,
                timestamp_formatted: formatted,
                title: mention.title,
                artist: mention.artist,
                extras: mention.extras,
                confidence: (blob_confidence + timed_bonus).min(1.0),
                source_author: blob.author.clone(),
                source_weight: blob.weight,
                is_unreleased_hint: mention.is_unreleased_hint,
            });
        }

        debug!(
            kind = ?blob.kind,
            stamps = stamps.len(),
            candidates = candidates.len(),
            "Blob assembled"
        );
        candidates
    }

    /// Assemble several blobs, concatenating results in input order
    pub fn assemble_all(&self, blobs: &[SourceBlob]) -> Vec<Vec<TrackCandidate>> {
        blobs.iter().map(|blob| self.assemble(blob)).collect()
    }

    fn line_mode(&self, text: &str) -> Vec<(Option<TimestampMatch>, String, ParsedMention)> {
        text.lines()
            .filter_map(|line| {
                let stamp = scan_timestamps(line).into_iter().next()?;
                let (fragment, mention) = mention_from_fragment(line)?;
                Some((Some(stamp), fragment, mention))
            })
            .collect()
    }

    fn slice_mode(
        &self,
        text: &str,
        stamps: &[TimestampMatch],
    ) -> Vec<(Option<TimestampMatch>, String, ParsedMention)> {
        let mut out = Vec::new();
        for (i, stamp) in stamps.iter().enumerate() {
            let slice_end = stamps.get(i + 1).map(|next| next.offset).unwrap_or(text.len());
            let after = first_line(&text[stamp.end..slice_end]);

            let found = mention_from_fragment(after).or_else(|| {
                // A lone comment often names the track before its time code
                if i == 0 {
                    mention_from_fragment(last_line(&text[..stamp.offset]))
                } else {
                    None
                }
            });

            if let Some((fragment, mention)) = found {
                out.push((Some(stamp.clone()), fragment, mention));
            }
        }
        out
    }

    fn untimed_mode(&self, text: &str) -> Vec<(Option<TimestampMatch>, String, ParsedMention)> {
        text.lines()
            .filter_map(mention_from_fragment)
            .map(|(fragment, mention)| (None, fragment, mention))
            .collect()
    }

    /// Confidence shared by every candidate of a blob (before the timed bonus)
    fn blob_confidence(&self, blob: &SourceBlob, stamp_count: usize) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if stamp_count >= FULL_TRACKLIST_MIN_STAMPS {
            confidence += FULL_TRACKLIST_BONUS;
        }
        if let Some((_, bonus)) = WEIGHT_TIERS.iter().find(|(min, _)| blob.weight > *min) {
            confidence += bonus;
        }
        if let Some(author) = &blob.author {
            let author = author.to_lowercase();
            if AUTHOR_KEYWORDS.iter().any(|k| author.contains(k)) {
                confidence += AUTHOR_BONUS;
            }
        }
        confidence
    }
}

/// Clean a raw fragment and run Noise Filter + Mention Parser over it
///
/// Fragments holding `|`/`;` are tried part by part; the first part that
/// parses wins.
fn mention_from_fragment(raw: &str) -> Option<(String, ParsedMention)> {
    clean_fragment(raw)
        .split(|c: char| c == '|' || c == ';')
        .map(clean_fragment)
        .filter(|part| !part.is_empty())
        .find_map(|part| match check_fragment(&part) {
            Ok(()) => parse_mention(&part).map(|mention| (part, mention)),
            Err(reason) => {
                trace!(?reason, fragment = %part, "Fragment rejected as noise");
                None
            }
        })
}

/// Strip time codes, empty brackets, bullets and ordinals from a fragment
fn clean_fragment(raw: &str) -> String {
    let without_codes = TIME_CODE.replace_all(raw, " ");
    let without_brackets = EMPTY_BRACKETS.replace_all(&without_codes, " ");
    let collapsed = without_brackets.split_whitespace().collect::<Vec<_>>().join(" ");

    let edge = |c: char| {
        c.is_whitespace() || matches!(c, '-' | '–' | '—' | '|' | ':' | '•' | '*' | '>' | '.' | ',' | '@' | '~')
    };
    let trimmed = collapsed.trim_matches(edge);
    let without_ordinal = LEADING_ORDINAL.replace(trimmed, "");
    let without_linker = TRAILING_LINKER.replace(without_ordinal.trim_matches(edge), "");
    without_linker.trim_matches(edge).to_string()
}

fn first_line(text: &str) -> &str {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or("")
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::types::SourceKind;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_line_mode_tracklist() {
        let text = "Tracklist:\n\
                    01. [0:30] Intro Track - Artist A\n\
                    02. [3:15] Second Song - Artist B\n\
                    03. [7:40] Third Song - Artist C\n";
        let blob = SourceBlob::new(SourceKind::Description, text);
        let candidates = CandidateAssembler::new().assemble(&blob);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].timestamp_seconds, 30);
        assert_eq!(candidates[0].title, "Intro Track");
        assert_eq!(candidates[0].artist, "Artist A");
        assert_eq!(candidates[1].timestamp_formatted.as_deref(), Some("3:15"));
        assert_eq!(candidates[2].timestamp_seconds, 460);
    }

    #[test]
    fn test_line_mode_uses_pipe_parts_when_whole_line_fails() {
        let text = "1:00 Opener - Artist A\n\
                    2:00 Closer - Artist B\n\
                    3:00 crowd going mad | Anthem by Artist C\n";
        let blob = SourceBlob::new(SourceKind::Description, text);
        let candidates = CandidateAssembler::new().assemble(&blob);

        let last = candidates.last().unwrap();
        assert_eq!(last.title, "Anthem");
        assert_eq!(last.artist, "Artist C");
        assert_eq!(last.timestamp_seconds, 180);
    }

    #[test]
    fn test_slice_mode_comment() {
        let blob = SourceBlob::new(SourceKind::Comment, "the drop at 45:10 Strings of Life by Derrick May");
        let candidates = CandidateAssembler::new().assemble(&blob);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].timestamp_seconds, 2710);
        assert_eq!(candidates[0].title, "Strings of Life");
        assert_eq!(candidates[0].artist, "Derrick May");
    }

    #[test]
    fn test_slice_mode_falls_back_to_text_before_first_stamp() {
        let blob = SourceBlob::new(SourceKind::Comment, "One More Time - Daft Punk at 12:30");
        let candidates = CandidateAssembler::new().assemble(&blob);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].timestamp_seconds, 750);
        assert_eq!(candidates[0].title, "One More Time");
        assert_eq!(candidates[0].artist, "Daft Punk");
    }

    #[test]
    fn test_noise_comments_yield_nothing() {
        let assembler = CandidateAssembler::new();
        for text in ["ID? 12:30", "12:30 🔥🔥🔥", "anyone know this one? 12:30"] {
            let blob = SourceBlob::new(SourceKind::Comment, text);
            assert!(assembler.assemble(&blob).is_empty(), "expected no candidate from {:?}", text);
        }
    }

    #[test]
    fn test_untimed_only_from_authoritative_blobs() {
        let text = "One More Time - Daft Punk\nStrings of Life by Derrick May";
        let assembler = CandidateAssembler::new();

        let description = assembler.assemble(&SourceBlob::new(SourceKind::Description, text));
        assert_eq!(description.len(), 2);
        assert!(description.iter().all(|c| !c.is_timed()));
        assert!(description.iter().all(|c| c.timestamp_formatted.is_none()));

        let comment = assembler.assemble(&SourceBlob::new(SourceKind::Comment, text));
        assert!(comment.is_empty());
    }

    #[test]
    fn test_confidence_tiers() {
        let blob = SourceBlob::new(SourceKind::Comment, "12:30 One More Time - Daft Punk")
            .with_author("TracklistBot")
            .with_weight(120);
        let candidates = CandidateAssembler::new().assemble(&blob);
        // base + timed + weight>100 + author keyword
        assert!(approx(candidates[0].confidence, 0.75), "got {}", candidates[0].confidence);

        let blob = SourceBlob::new(SourceKind::Comment, "12:30 One More Time - Daft Punk").with_weight(11);
        let candidates = CandidateAssembler::new().assemble(&blob);
        assert!(approx(candidates[0].confidence, 0.55));
    }

    #[test]
    fn test_full_tracklist_bonus_and_cap() {
        let text = "1:00 A1 - Artist\n2:00 A2 - Artist\n3:00 A3 - Artist\n4:00 A4 - Artist\n5:00 A5 - Artist";
        let blob = SourceBlob::new(SourceKind::Description, text)
            .with_author("1001Tracklists")
            .with_weight(500);
        let candidates = CandidateAssembler::new().assemble(&blob);

        assert_eq!(candidates.len(), 5);
        // 0.30 + 0.20 + 0.20 + 0.15 + 0.10 = 0.95
        assert!(approx(candidates[0].confidence, 0.95));
        assert!(candidates.iter().all(|c| c.confidence <= 1.0));
    }

    #[test]
    fn test_duplicates_within_blob_removed() {
        let text = "1:00 Song - Artist\n1:00 song - ARTIST\n2:00 Other - Artist\n3:00 Third - Artist";
        let blob = SourceBlob::new(SourceKind::Description, text);
        let candidates = CandidateAssembler::new().assemble(&blob);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_unreleased_hint_carried() {
        let blob = SourceBlob::new(SourceKind::Comment, "20:00 Luke Dean - Telling Lies (unreleased)");
        let candidates = CandidateAssembler::new().assemble(&blob);
        assert!(candidates[0].is_unreleased_hint);
    }

    #[test]
    fn test_clean_fragment() {
        assert_eq!(clean_fragment("01. [12:30] Title - Artist"), "Title - Artist");
        assert_eq!(clean_fragment("  - 1:02:03 | Title - Artist |"), "Title - Artist");
        assert_eq!(clean_fragment("#4 Title - Artist"), "Title - Artist");
        assert_eq!(clean_fragment("808 State - Pacific"), "808 State - Pacific");
        assert_eq!(clean_fragment("Title - Artist at"), "Title - Artist");
    }
}
