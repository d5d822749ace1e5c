pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::analysis;
use crate::revision;
use crate::state::AppState;
use crate::workflow::handlers;

/// Uploads up to 10 MiB, plus base64 overhead for JSON-embedded documents.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stateless contract endpoints
        .route("/api/v1/analyze", post(analysis::handlers::handle_analyze))
        .route("/api/v1/revise", post(revision::handlers::handle_revise))
        // Session workflow
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/source", put(handlers::handle_put_source))
        .route("/api/v1/sessions/:id/upload", post(handlers::handle_upload))
        .route(
            "/api/v1/sessions/:id/job-description",
            put(handlers::handle_put_job_description),
        )
        .route("/api/v1/sessions/:id/analyze", post(handlers::handle_analyze))
        .route(
            "/api/v1/sessions/:id/draft",
            axum::routing::patch(handlers::handle_edit_draft),
        )
        .route("/api/v1/sessions/:id/revise", post(handlers::handle_revise))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route("/api/v1/sessions/:id/export", get(handlers::handle_export))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
