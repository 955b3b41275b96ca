//! Tracklist endpoints
//!
//! - `POST /tracklist/import`: reconcile a candidate batch into a performance
//! - `POST /tracklist/extract`: assemble and merge candidates from text blobs
//! - `POST /tracklist/ingest`: extract, then import the result
//! - `GET /performances/:id/tracklist`: canonical entries with a fresh count

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use setlist_common::{CanonicalTrackEntry, SourceTag};
use tracing::info;
use uuid::Uuid;

use crate::db::TracklistStore;
use crate::extraction::{CandidateAssembler, SourceBlob, TrackCandidate};
use crate::services::{ImportCandidate, ImportRequest, ImportSummary};
use crate::{ApiError, ApiResult, AppState};

/// Request payload for extraction
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub blobs: Vec<SourceBlob>,
}

/// Response payload for extraction
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub candidates: Vec<TrackCandidate>,
}

/// Request payload for extract-then-import
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub performance_id: Option<Uuid>,
    #[serde(default)]
    pub blobs: Vec<SourceBlob>,
    /// Defaults to the tag of the highest-ranked blob
    #[serde(default)]
    pub source_tag: Option<SourceTag>,
    #[serde(default)]
    pub cover_art_url: Option<String>,
}

/// Response payload for extract-then-import
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub candidates: Vec<TrackCandidate>,
    pub summary: ImportSummary,
}

/// Canonical tracklist of one performance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistResponse {
    pub performance_id: Uuid,
    pub count: u64,
    pub entries: Vec<CanonicalTrackEntry>,
}

/// POST /tracklist/import
///
/// **Errors:**
/// - 400 Bad Request: missing performanceId or empty candidates
/// - 500 Internal Server Error: existing entries could not be read
pub async fn import_tracklist(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportSummary>> {
    let summary = state.reconciler.import(&request).await?;
    Ok(Json(summary))
}

/// POST /tracklist/extract
pub async fn extract_candidates(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<Json<ExtractResponse>> {
    if request.blobs.is_empty() {
        return Err(ApiError::BadRequest("blobs must not be empty".to_string()));
    }

    let candidates = state
        .settings
        .merger()
        .merge_blobs(&CandidateAssembler::new(), &request.blobs);

    Ok(Json(ExtractResponse { candidates }))
}

/// POST /tracklist/ingest
///
/// Extraction yielding no candidates is not an error: the summary is
/// all zeros with the current entry count.
pub async fn ingest_blobs(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    let performance_id = request
        .performance_id
        .ok_or_else(|| ApiError::BadRequest("performanceId is required".to_string()))?;
    if request.blobs.is_empty() {
        return Err(ApiError::BadRequest("blobs must not be empty".to_string()));
    }

    let merger = state.settings.merger();
    let candidates = merger.merge_blobs(&CandidateAssembler::new(), &request.blobs);

    if candidates.is_empty() {
        info!(performance_id = %performance_id, blobs = request.blobs.len(), "No candidates extracted");
        let count = state.store.count_entries(performance_id).await?;
        return Ok(Json(IngestResponse {
            candidates,
            summary: ImportSummary {
                existing_count: count,
                final_count: count,
                ..Default::default()
            },
        }));
    }

    let source_tag = request.source_tag.unwrap_or_else(|| {
        merger
            .rank_blobs(&request.blobs)
            .first()
            .map(|blob| blob.kind.source_tag())
            .unwrap_or(SourceTag::Comment)
    });

    let import = ImportRequest {
        performance_id: Some(performance_id),
        candidates: candidates.iter().cloned().map(ImportCandidate::from).collect(),
        source_tag,
        cover_art_url: request.cover_art_url,
    };
    let summary = state.reconciler.import(&import).await?;

    Ok(Json(IngestResponse { candidates, summary }))
}

/// GET /performances/:id/tracklist
pub async fn get_tracklist(
    State(state): State<AppState>,
    Path(performance_id): Path<Uuid>,
) -> ApiResult<Json<TracklistResponse>> {
    let entries = state.store.entries_for_performance(performance_id).await?;
    let count = state.store.count_entries(performance_id).await?;

    Ok(Json(TracklistResponse {
        performance_id,
        count,
        entries,
    }))
}

/// Build tracklist routes
pub fn tracklist_routes() -> Router<AppState> {
    Router::new()
        .route("/tracklist/import", post(import_tracklist))
        .route("/tracklist/extract", post(extract_candidates))
        .route("/tracklist/ingest", post(ingest_blobs))
        .route("/performances/:id/tracklist", get(get_tracklist))
}
