//! Axum route handlers for one-shot revision.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::resume::{AnalysisResult, RectifyResponse};
use crate::revision::rewriter::revise;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviseRequest {
    pub analysis: AnalysisResult,
    pub job_description: Option<String>,
}

/// POST /api/v1/revise
///
/// Stateless revision of a previously returned analysis. The caller re-scores
/// the result with /api/v1/analyze if it wants an updated match score.
pub async fn handle_revise(
    State(state): State<AppState>,
    Json(request): Json<ReviseRequest>,
) -> Result<Json<RectifyResponse>, AppError> {
    let response = revise(
        state.llm.as_ref(),
        &request.analysis,
        request.job_description.as_deref(),
    )
    .await?;

    Ok(Json(response))
}
