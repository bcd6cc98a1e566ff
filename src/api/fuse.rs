use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::{error_status, normalize_query};
use crate::models::{FuseResponse, QueryRequest};
use crate::state::AppState;

/// POST /api/fuse - Multi-query retrieval pipeline:
///   1. Query expansion (original + N rephrasings)
///   2. One similarity search per variant, run concurrently
///   3. Reciprocal rank fusion, deduplicated by content
///   4. Context truncated to the configured limit
///
/// Over-long queries are cut at a char boundary before the engine sees them.
pub async fn fuse(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<FuseResponse>, (StatusCode, String)> {
    let query = normalize_query(&req.query)?;

    let params = state.fusion_snapshot();
    let outcome = state
        .engine
        .run(&query, &params)
        .await
        .map_err(error_status)?;

    Ok(Json(FuseResponse::from(&outcome)))
}
