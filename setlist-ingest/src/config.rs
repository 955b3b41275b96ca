//! Runtime matching settings
//!
//! Read from the database `settings` table at startup. Missing or
//! unparseable values fall back to the built-in defaults.

use setlist_common::db::{
    get_setting_or, SETTING_DEDUP_SIMILARITY_THRESHOLD, SETTING_MATCH_THRESHOLD,
    SETTING_MERGE_WINDOW_SECONDS, SETTING_NEAR_DUPLICATE_THRESHOLD,
};
use setlist_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::extraction::source_merger::DEFAULT_WINDOW_SECONDS;
use crate::extraction::CrossSourceMerger;
use crate::matching::identity_matcher::{DEFAULT_MATCH_THRESHOLD, DEFAULT_NEAR_DUPLICATE_THRESHOLD};
use crate::matching::IdentityMatcher;
use crate::services::deduplicator::DEFAULT_DEDUP_SIMILARITY_THRESHOLD;

/// Tunable thresholds for matching, merging and deduplication
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub match_threshold: f64,
    pub near_duplicate_threshold: f64,
    pub merge_window_seconds: u32,
    pub dedup_similarity_threshold: f64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            near_duplicate_threshold: DEFAULT_NEAR_DUPLICATE_THRESHOLD,
            merge_window_seconds: DEFAULT_WINDOW_SECONDS,
            dedup_similarity_threshold: DEFAULT_DEDUP_SIMILARITY_THRESHOLD,
        }
    }
}

impl MatchSettings {
    /// Load from the settings table
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            match_threshold: unit_interval(
                SETTING_MATCH_THRESHOLD,
                get_setting_or(pool, SETTING_MATCH_THRESHOLD, defaults.match_threshold).await?,
                defaults.match_threshold,
            ),
            near_duplicate_threshold: unit_interval(
                SETTING_NEAR_DUPLICATE_THRESHOLD,
                get_setting_or(pool, SETTING_NEAR_DUPLICATE_THRESHOLD, defaults.near_duplicate_threshold).await?,
                defaults.near_duplicate_threshold,
            ),
            merge_window_seconds: get_setting_or(pool, SETTING_MERGE_WINDOW_SECONDS, defaults.merge_window_seconds)
                .await?,
            dedup_similarity_threshold: unit_interval(
                SETTING_DEDUP_SIMILARITY_THRESHOLD,
                get_setting_or(pool, SETTING_DEDUP_SIMILARITY_THRESHOLD, defaults.dedup_similarity_threshold)
                    .await?,
                defaults.dedup_similarity_threshold,
            ),
        };

        info!(
            match_threshold = settings.match_threshold,
            near_duplicate_threshold = settings.near_duplicate_threshold,
            merge_window_seconds = settings.merge_window_seconds,
            dedup_similarity_threshold = settings.dedup_similarity_threshold,
            "Matching settings loaded"
        );
        Ok(settings)
    }

    pub fn matcher(&self) -> IdentityMatcher {
        IdentityMatcher::new(self.match_threshold, self.near_duplicate_threshold)
    }

    pub fn merger(&self) -> CrossSourceMerger {
        CrossSourceMerger::new(self.merge_window_seconds)
    }
}

/// Thresholds outside [0, 1] are configuration mistakes
fn unit_interval(key: &str, value: f64, default: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warn!(key, value, default, "Setting out of range, using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_common::db::{init_memory_database, set_setting};

    #[tokio::test]
    async fn test_load_seeded_defaults() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(MatchSettings::load(&pool).await.unwrap(), MatchSettings::default());
    }

    #[tokio::test]
    async fn test_load_overrides_and_bad_values() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, SETTING_MATCH_THRESHOLD, 0.7).await.unwrap();
        set_setting(&pool, SETTING_MERGE_WINDOW_SECONDS, "not a number").await.unwrap();
        set_setting(&pool, SETTING_NEAR_DUPLICATE_THRESHOLD, 4.0).await.unwrap();

        let settings = MatchSettings::load(&pool).await.unwrap();
        assert_eq!(settings.match_threshold, 0.7);
        assert_eq!(settings.merge_window_seconds, DEFAULT_WINDOW_SECONDS);
        assert_eq!(settings.near_duplicate_threshold, DEFAULT_NEAR_DUPLICATE_THRESHOLD);
        assert_eq!(settings.matcher().match_threshold(), 0.7);
    }
}
