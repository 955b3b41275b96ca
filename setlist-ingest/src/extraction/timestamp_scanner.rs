//! Timestamp Scanner
//!
//! Finds every time-code-shaped token in a text blob. `H:MM:SS` is matched
//! first; an `M:SS` hit inside an already-matched long-form span (plus a
//! small trailing slack) is discarded.

use once_cell::sync::Lazy;
use regex::Regex;

static LONG_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):([0-5]\d):([0-5]\d)\b").expect("valid regex"));

static SHORT_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3}):([0-5]\d)\b").expect("valid regex"));

/// Bytes past a long-form match that still count as inside it
const TRAILING_SLACK: usize = 2;

/// One time code found in a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    pub seconds: u32,
    /// Text exactly as written
    pub formatted: String,
    /// Byte offset of the match start
    pub offset: usize,
    /// Byte offset one past the match end
    pub end: usize,
}

/// Scan a blob for time codes
///
/// Returns matches in ascending offset order without duplicates. No match
/// yields an empty vector.
pub fn scan_timestamps(text: &str) -> Vec<TimestampMatch> {
    let mut matches: Vec<TimestampMatch> = Vec::new();

    for caps in LONG_FORM.captures_iter(text) {
        let (Some(whole), Some(h), Some(m), Some(s)) = (caps.get(0), caps.get(1), caps.get(2), caps.get(3)) else {
            continue;
        };
        let (Ok(h), Ok(m), Ok(s)) = (h.as_str().parse::<u32>(), m.as_str().parse::<u32>(), s.as_str().parse::<u32>()) else {
            continue;
        };
        matches.push(TimestampMatch {
            seconds: h * 3600 + m * 60 + s,
            formatted: whole.as_str().to_string(),
            offset: whole.start(),
            end: whole.end(),
        });
    }

    let long_spans: Vec<(usize, usize)> = matches.iter().map(|m| (m.offset, m.end)).collect();

    for caps in SHORT_FORM.captures_iter(text) {
        let (Some(whole), Some(m), Some(s)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let inside_long = long_spans
            .iter()
            .any(|(start, end)| whole.start() >= *start && whole.start() < end + TRAILING_SLACK);
        if inside_long {
            continue;
        }
        let (Ok(m), Ok(s)) = (m.as_str().parse::<u32>(), s.as_str().parse::<u32>()) else {
            continue;
        };
        matches.push(TimestampMatch {
            seconds: m * 60 + s,
            formatted: whole.as_str().to_string(),
            offset: whole.start(),
            end: whole.end(),
        });
    }

    matches.sort_by_key(|m| m.offset);
    matches.dedup_by_key(|m| m.offset);
    matches
}
