use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and model wiring.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "rectify",
        "model": state.config.gemini_model,
        "credential_configured": state.config.has_credential(),
        "active_sessions": state.workflow.sessions().count().await,
    }))
}
