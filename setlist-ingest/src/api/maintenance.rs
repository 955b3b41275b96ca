//! Catalog maintenance endpoints

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::services::DedupReport;
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct DedupParams {
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /maintenance/dedup?dry_run=true|false
///
/// Runs the Offline Deduplicator to completion and returns its report.
pub async fn run_dedup(
    State(state): State<AppState>,
    Query(params): Query<DedupParams>,
) -> ApiResult<Json<DedupReport>> {
    let report = state.deduplicator().run(params.dry_run).await?;
    Ok(Json(report))
}

/// Build maintenance routes
pub fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/maintenance/dedup", post(run_dedup))
}
