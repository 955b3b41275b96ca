//! setlist-ingest library interface
//!
//! Extracts timestamped track candidates from DJ-set text and reconciles
//! them into canonical per-performance tracklists. Exposed as a library for
//! the binary and for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod matching;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::MatchSettings;
use crate::db::SqliteStore;
use crate::services::{Catalog, IdentificationOracle, OfflineDeduplicator, Reconciler};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Storage adapter over `db`
    pub store: Arc<SqliteStore>,
    pub catalog: Arc<Catalog>,
    pub reconciler: Arc<Reconciler>,
    pub settings: MatchSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: MatchSettings) -> Self {
        Self::with_oracle(db, settings, None)
    }

    /// State whose reconciler checks new entries against `oracle`
    pub fn with_oracle(
        db: SqlitePool,
        settings: MatchSettings,
        oracle: Option<Arc<dyn IdentificationOracle>>,
    ) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        let catalog = Arc::new(Catalog::new(store.clone()));

        let mut reconciler = Reconciler::new(store.clone(), settings.matcher()).with_catalog(catalog.clone());
        if let Some(oracle) = oracle {
            reconciler = reconciler.with_oracle(oracle);
        }

        Self {
            db,
            store,
            catalog,
            reconciler: Arc::new(reconciler),
            settings,
            startup_time: Utc::now(),
        }
    }

    /// Deduplicator over this state's catalog
    pub fn deduplicator(&self) -> OfflineDeduplicator {
        OfflineDeduplicator::new(self.store.clone(), self.settings.dedup_similarity_threshold)
            .with_catalog(self.catalog.clone())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::tracklist_routes())
        .merge(api::maintenance_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
