//! Axum route handlers for the session workflow API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{DocumentPayload, DraftSection, ResumeSource};
use crate::state::AppState;
use crate::workflow::machine::{Event, WorkflowError};
use crate::workflow::render::export_text;
use crate::workflow::sessions::SessionSnapshot;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    pub source: ResumeSource,
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub job_description: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

async fn dispatch(state: &AppState, id: Uuid, event: Event) -> Result<Json<SessionSnapshot>, AppError> {
    let dispatched = state.workflow.dispatch(id, event).await?;
    Ok(Json(dispatched.into_result()?))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let snapshot = state.workflow.sessions().create().await;
    (StatusCode::CREATED, Json(snapshot))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.workflow.sessions().snapshot(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.workflow.sessions().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/source
///
/// Sets pasted text (or a base64 document) as the resume to analyse.
pub async fn handle_put_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SourceRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    request.source.validate().map_err(AppError::Validation)?;
    dispatch(
        &state,
        id,
        Event::SourceProvided {
            source: request.source,
            job_description: request.job_description,
        },
    )
    .await
}

/// POST /api/v1/sessions/:id/upload
///
/// Multipart form: `file` (required), `job_description` (optional).
/// Plain-text files are read as pasted text; anything else is sent to the model as a document.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut source = None;
    let mut job_description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("resume").to_string();
                let mime_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
                    .map(str::to_string)
                    .unwrap_or_else(|| infer_mime_type(&name).to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

                source = Some(if mime_type.starts_with("text/plain") {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        AppError::Validation(format!("'{name}' is not valid UTF-8 text"))
                    })?;
                    ResumeSource::Text(text)
                } else {
                    ResumeSource::File(DocumentPayload::from_bytes(&bytes, mime_type, name))
                });
            }
            Some("job_description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read job_description: {e}"))
                })?;
                job_description = Some(text);
            }
            _ => {}
        }
    }

    let source =
        source.ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;
    source.validate().map_err(AppError::Validation)?;

    dispatch(
        &state,
        id,
        Event::SourceProvided {
            source,
            job_description,
        },
    )
    .await
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_put_job_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<JobDescriptionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    dispatch(&state, id, Event::JobDescriptionChanged(request.job_description)).await
}

/// POST /api/v1/sessions/:id/analyze
///
/// Runs extraction; the response arrives once the model call completes.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    dispatch(&state, id, Event::AnalyzeRequested).await
}

/// PATCH /api/v1/sessions/:id/draft
///
/// Body: `{"section": "<name>", "value": ...}`. Replaces that section whole.
pub async fn handle_edit_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(section): Json<DraftSection>,
) -> Result<Json<SessionSnapshot>, AppError> {
    dispatch(&state, id, Event::DraftEdited(section)).await
}

/// POST /api/v1/sessions/:id/revise
///
/// Rewrites summary and experience, then re-scores the rewritten text.
pub async fn handle_revise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    dispatch(&state, id, Event::ReviseRequested).await
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    dispatch(&state, id, Event::Reset).await
}

/// GET /api/v1/sessions/:id/export
///
/// Plain-text rendering of the current draft, for the PDF renderer.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state
        .workflow
        .sessions()
        .draft(id)
        .await?
        .ok_or(WorkflowError::NoAnalysis)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&draft.personal_info.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export_text(&draft),
    ))
}

fn infer_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn export_file_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "resume.txt".to_string()
    } else {
        format!("{slug}-resume.txt")
    }
}
