//! Identity Matcher
//!
//! Finds the canonical entry a candidate most likely refers to. Every entry
//! is scored under each [`MatchStrategy`]; the single best (entry, strategy)
//! pair across the performance wins if it clears the match threshold.
//!
//! A second pass with title-only weights and a lower threshold catches
//! near-duplicates that failed the identity match but would still pollute
//! the tracklist if inserted.

use serde::Serialize;
use setlist_common::text::{is_placeholder_name, normalize_text};
use setlist_common::CanonicalTrackEntry;

use super::similarity::normalized_similarity;
use crate::extraction::TrackCandidate;

/// Default identity-match acceptance threshold
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Default near-duplicate suppression threshold
pub const DEFAULT_NEAR_DUPLICATE_THRESHOLD: f64 = 0.5;

/// Anything with a title and an artist
pub trait TrackIdentity {
    fn title(&self) -> &str;
    fn artist(&self) -> &str;
}

impl TrackIdentity for CanonicalTrackEntry {
    fn title(&self) -> &str {
        &self.track_title
    }

    fn artist(&self) -> &str {
        &self.artist_name
    }
}

impl TrackIdentity for TrackCandidate {
    fn title(&self) -> &str {
        &self.title
    }

    fn artist(&self) -> &str {
        &self.artist
    }
}

/// Relative weight of the title and artist components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub title: f64,
    pub artist: f64,
}

impl MatchWeights {
    /// Identity match: title dominates, artist confirms
    pub const IDENTITY: MatchWeights = MatchWeights { title: 0.7, artist: 0.3 };

    /// Near-duplicate check: titles only
    pub const TITLE_ONLY: MatchWeights = MatchWeights { title: 1.0, artist: 0.0 };
}

/// Field-ordering hypothesis for comparing a candidate to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// title ↔ title, artist ↔ artist
    Direct,
    /// Candidate fields reversed
    Swapped,
    /// Weighted fields concatenated on each side, compared as one string
    Pooled,
}

impl MatchStrategy {
    /// Evaluation order; on equal scores the earlier strategy wins
    pub const ALL: [MatchStrategy; 3] = [Self::Direct, Self::Swapped, Self::Pooled];

    pub fn penalty(self) -> f64 {
        match self {
            Self::Direct => 1.0,
            Self::Swapped => 0.9,
            Self::Pooled => 0.95,
        }
    }

    /// Score a candidate against an entry in [0, 1]
    pub fn score(
        self,
        candidate: &impl TrackIdentity,
        entry: &impl TrackIdentity,
        weights: MatchWeights,
    ) -> f64 {
        let raw = match self {
            Self::Direct => {
                weights.title * field_similarity(candidate.title(), entry.title())
                    + weights.artist * field_similarity(candidate.artist(), entry.artist())
            }
            Self::Swapped => {
                weights.title * field_similarity(candidate.artist(), entry.title())
                    + weights.artist * field_similarity(candidate.title(), entry.artist())
            }
            Self::Pooled => match (pool(candidate, weights), pool(entry, weights)) {
                (Some(a), Some(b)) => field_similarity(&a, &b) * (weights.title + weights.artist),
                _ => 0.0,
            },
        };
        raw * self.penalty()
    }
}

/// Best-scoring (entry, strategy) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch {
    /// Index into the entry slice that was searched
    pub index: usize,
    pub strategy: MatchStrategy,
    pub score: f64,
}

/// Outcome of an identity match
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchVerdict {
    Matched(ScoredMatch),
    /// No entry cleared the threshold; carries the best score seen
    NoMatch { best_score: f64 },
}

/// Candidate-to-entry matcher with configurable thresholds
#[derive(Debug, Clone, Copy)]
pub struct IdentityMatcher {
    match_threshold: f64,
    near_duplicate_threshold: f64,
}

impl Default for IdentityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DEFAULT_NEAR_DUPLICATE_THRESHOLD)
    }
}

impl IdentityMatcher {
    pub fn new(match_threshold: f64, near_duplicate_threshold: f64) -> Self {
        Self {
            match_threshold,
            near_duplicate_threshold,
        }
    }

    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    pub fn near_duplicate_threshold(&self) -> f64 {
        self.near_duplicate_threshold
    }

    /// Identity match against a performance's entries
    pub fn find_match<C, E>(&self, candidate: &C, entries: &[E]) -> MatchVerdict
    where
        C: TrackIdentity,
        E: TrackIdentity,
    {
        match best_scored(candidate, entries, MatchWeights::IDENTITY) {
            Some(best) if best.score >= self.match_threshold => MatchVerdict::Matched(best),
            Some(best) => MatchVerdict::NoMatch { best_score: best.score },
            None => MatchVerdict::NoMatch { best_score: 0.0 },
        }
    }

    /// Title-only near-duplicate check, run after a failed identity match
    pub fn find_near_duplicate<C, E>(&self, candidate: &C, entries: &[E]) -> Option<ScoredMatch>
    where
        C: TrackIdentity,
        E: TrackIdentity,
    {
        best_scored(candidate, entries, MatchWeights::TITLE_ONLY)
            .filter(|best| best.score >= self.near_duplicate_threshold)
    }
}

/// Global best over every entry and strategy
fn best_scored<C, E>(candidate: &C, entries: &[E], weights: MatchWeights) -> Option<ScoredMatch>
where
    C: TrackIdentity,
    E: TrackIdentity,
{
    let mut best: Option<ScoredMatch> = None;
    for (index, entry) in entries.iter().enumerate() {
        for strategy in MatchStrategy::ALL {
            let score = strategy.score(candidate, entry, weights);
            if best.map_or(true, |b| score > b.score) {
                best = Some(ScoredMatch { index, strategy, score });
            }
        }
    }
    best
}

/// Similarity where an "ID"-style placeholder never matches anything
fn field_similarity(a: &str, b: &str) -> f64 {
    if is_placeholder_name(a) || is_placeholder_name(b) {
        return 0.0;
    }
    normalized_similarity(&normalize_text(a), &normalize_text(b))
}

/// Concatenate the fields that carry weight
///
/// `None` when a weighted field is a placeholder: pooling would otherwise
/// let the remaining field match on its own.
fn pool(identity: &impl TrackIdentity, weights: MatchWeights) -> Option<String> {
    let mut parts = Vec::with_capacity(2);
    for (weight, field) in [(weights.title, identity.title()), (weights.artist, identity.artist())] {
        if weight > 0.0 {
            if is_placeholder_name(field) {
                return None;
            }
            parts.push(field);
        }
    }
    Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(&'static str, &'static str);

    impl TrackIdentity for Pair {
        fn title(&self) -> &str {
            self.0
        }
        fn artist(&self) -> &str {
            self.1
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_direct_exact_match() {
        let entries = [Pair("One More Time", "Daft Punk")];
        let verdict = IdentityMatcher::default().find_match(&Pair("One More Time", "Daft Punk"), &entries);
        match verdict {
            MatchVerdict::Matched(m) => {
                assert_eq!(m.strategy, MatchStrategy::Direct);
                assert!(approx(m.score, 1.0));
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_swapped_fields_detected() {
        let candidate = Pair("Daft Punk", "One More Time");
        let entry = Pair("One More Time", "Daft Punk");

        let swapped = MatchStrategy::Swapped.score(&candidate, &entry, MatchWeights::IDENTITY);
        assert!(approx(swapped, 0.9));
        assert!(MatchStrategy::Direct.score(&candidate, &entry, MatchWeights::IDENTITY) < 0.6);

        let verdict = IdentityMatcher::default().find_match(&candidate, &[entry]);
        let MatchVerdict::Matched(m) = verdict else {
            panic!("swapped fields must match");
        };
        assert_eq!(m.index, 0);
        assert!(m.score >= 0.6);
    }

    #[test]
    fn test_pooled_handles_mis_split_fields() {
        // Artist leaked into the title field
        let candidate = Pair("Daft Punk One More Time", "Live");
        let entry = Pair("One More Time", "Daft Punk");
        let pooled = MatchStrategy::Pooled.score(&candidate, &entry, MatchWeights::IDENTITY);
        assert!(pooled >= 0.6, "got {}", pooled);
    }

    #[test]
    fn test_best_entry_wins_globally() {
        let entries = [
            Pair("Strings", "Derrick May"),
            Pair("Strings of Life", "Derrick May"),
        ];
        let verdict = IdentityMatcher::default().find_match(&Pair("Strings of Life", "Derrick May"), &entries);
        assert!(matches!(verdict, MatchVerdict::Matched(ScoredMatch { index: 1, .. })));
    }

    #[test]
    fn test_no_match_reports_best_score() {
        let entries = [Pair("Strings of Life", "Derrick May")];
        let verdict = IdentityMatcher::default().find_match(&Pair("Innerbloom", "Rufus Du Sol"), &entries);
        match verdict {
            MatchVerdict::NoMatch { best_score } => assert!(best_score < 0.6),
            other => panic!("unexpected {:?}", other),
        }

        let empty: [Pair; 0] = [];
        assert_eq!(
            IdentityMatcher::default().find_match(&Pair("A", "B"), &empty),
            MatchVerdict::NoMatch { best_score: 0.0 }
        );
    }

    #[test]
    fn test_digit_variant_matches() {
        let entries = [Pair("Be Good to Me", "Luke Dean")];
        let verdict = IdentityMatcher::default().find_match(&Pair("Be Good 2 Me", "Luke Dean"), &entries);
        let MatchVerdict::Matched(m) = verdict else {
            panic!("expected match");
        };
        // 0.7 * 0.75 + 0.3 * 1.0
        assert!(approx(m.score, 0.825));
    }

    #[test]
    fn test_near_duplicate_title_only() {
        let entries = [Pair("Be Good to Me", "Luke Dean")];
        let matcher = IdentityMatcher::default();

        // Unrelated artist defeats the identity match but not the title check
        let candidate = Pair("Be Good 2 Me", "Unknown Collective");
        assert!(matches!(matcher.find_match(&candidate, &entries), MatchVerdict::NoMatch { .. }));
        let near = matcher.find_near_duplicate(&candidate, &entries).expect("title-only near-duplicate");
        assert!(approx(near.score, 0.75));

        let unrelated = Pair("Telling Lies", "Luke Dean");
        assert!(matcher.find_near_duplicate(&unrelated, &entries).is_none());
    }

    #[test]
    fn test_placeholders_never_match() {
        let entries = [Pair("ID", "Luke Dean")];
        let matcher = IdentityMatcher::default();
        let verdict = matcher.find_match(&Pair("ID", "Luke Dean"), &entries);
        assert!(matches!(verdict, MatchVerdict::NoMatch { .. }));
        assert!(matcher.find_near_duplicate(&Pair("ID", "Someone"), &entries).is_none());
    }
}
