//! Similarity Scorer
//!
//! Likeness of two free-text strings in [0, 1], shared by the Identity
//! Matcher and the Offline Deduplicator.
//!
//! Tiers, evaluated on normalized text:
//! 1. Either side empty: 0.0
//! 2. Exact: 1.0
//! 3. One side contained in the other: 0.85
//! 4. Word overlap: each word of `a` takes its best counterpart in `b`
//!    (exact 1.0, substring 0.8, edit-distance score above 0.75 for words
//!    of 3+ chars), summed and divided by the larger word count.
//!
//! The word tier tolerates typos and partial titles; it is not symmetric.

use setlist_common::text::normalize_text;

pub const CONTAINMENT_SCORE: f64 = 0.85;
const SUBSTRING_WORD_SCORE: f64 = 0.8;
const FUZZY_WORD_MIN_CHARS: usize = 3;
const FUZZY_WORD_MIN_SCORE: f64 = 0.75;

/// Score two strings
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    normalized_similarity(&a, &b)
}

/// Score two strings that are already normalized
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(b) || b.contains(a) {
        return CONTAINMENT_SCORE;
    }

    let words_a: Vec<&str> = a.split(' ').collect();
    let words_b: Vec<&str> = b.split(' ').collect();

    let total: f64 = words_a
        .iter()
        .map(|wa| {
            words_b
                .iter()
                .map(|wb| word_score(wa, wb))
                .fold(0.0, f64::max)
        })
        .sum();

    total / words_a.len().max(words_b.len()) as f64
}

fn word_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.contains(b) || b.contains(a) {
        return SUBSTRING_WORD_SCORE;
    }
    if a.chars().count() >= FUZZY_WORD_MIN_CHARS && b.chars().count() >= FUZZY_WORD_MIN_CHARS {
        let score = strsim::normalized_levenshtein(a, b);
        if score > FUZZY_WORD_MIN_SCORE {
            return score;
        }
    }
    0.0
}
