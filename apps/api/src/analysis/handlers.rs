//! Axum route handlers for one-shot analysis.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::analysis::extractor::analyze;
use crate::errors::AppError;
use crate::models::resume::{AnalysisResult, ResumeSource};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub source: ResumeSource,
    pub job_description: Option<String>,
}

/// POST /api/v1/analyze
///
/// Stateless extraction: nothing is stored server-side.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    request.source.validate().map_err(AppError::Validation)?;

    let result = analyze(
        state.llm.as_ref(),
        &request.source,
        request.job_description.as_deref(),
    )
    .await?;

    Ok(Json(result))
}
