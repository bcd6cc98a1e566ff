use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::{error_status, normalize_query};
use crate::models::{AskResponse, FuseResponse, QueryRequest};
use crate::state::AppState;

/// POST /api/ask - Fused retrieval followed by a grounded answer.
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<AskResponse>, (StatusCode, String)> {
    let question = normalize_query(&req.query)?;

    let params = state.fusion_snapshot();
    let (answer, outcome) = state
        .engine
        .answer(&question, &params)
        .await
        .map_err(error_status)?;

    Ok(Json(AskResponse {
        answer,
        retrieval: FuseResponse::from(&outcome),
    }))
}
