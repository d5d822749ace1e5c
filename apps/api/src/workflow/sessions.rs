//! In-memory session store. One `WorkflowState` per UI session, nothing persisted.
//!
//! Transitions run under the write lock; the lock is never held across a
//! delegate call, so a slow model call only blocks its own session (via the
//! busy phase), not the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{AnalysisResult, ResumeDraft, ResumeSource};
use crate::workflow::machine::{transition, Effect, Event, Phase, WorkflowState};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the UI sees of a resume source. The document body is never echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSummary {
    Text { chars: usize },
    File { name: String, mime_type: String },
}

impl From<&ResumeSource> for SourceSummary {
    fn from(source: &ResumeSource) -> Self {
        match source {
            ResumeSource::Text(text) => SourceSummary::Text {
                chars: text.chars().count(),
            },
            ResumeSource::File(doc) => SourceSummary::File {
                name: doc.name.clone(),
                mime_type: doc.mime_type.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: Phase,
    pub busy: bool,
    pub source: Option<SourceSummary>,
    pub job_description: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub draft: Option<ResumeDraft>,
    pub baseline_score: Option<f64>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        let state = &session.state;
        Self {
            id: session.id,
            phase: state.phase,
            busy: state.phase.is_busy(),
            source: state.source.as_ref().map(SourceSummary::from),
            job_description: state.job_description.clone(),
            analysis: state.analysis.clone(),
            draft: state.draft.clone(),
            baseline_score: state.baseline_score,
            last_error: state.last_error.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionSnapshot {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            state: WorkflowState::default(),
            created_at: now,
            updated_at: now,
        };
        let snapshot = SessionSnapshot::from(&session);
        self.inner.write().await.insert(session.id, session);
        info!("Created session {}", snapshot.id);
        snapshot
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, AppError> {
        self.inner
            .read()
            .await
            .get(&id)
            .map(SessionSnapshot::from)
            .ok_or_else(|| not_found(id))
    }

    pub async fn draft(&self, id: Uuid) -> Result<Option<ResumeDraft>, AppError> {
        self.inner
            .read()
            .await
            .get(&id)
            .map(|s| s.state.draft.clone())
            .ok_or_else(|| not_found(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Removed session {id}"))
            .ok_or_else(|| not_found(id))
    }

    /// Applies one event and stores the resulting state. A rejected event
    /// leaves the stored state untouched.
    pub async fn apply(&self, id: Uuid, event: Event) -> Result<Option<Effect>, AppError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

        let event_name = event.name();
        let from = session.state.phase;
        let step = transition(&session.state, event)?;

        session.state = step.state;
        session.updated_at = Utc::now();
        debug!(
            "Session {id}: {event_name} ({from} -> {})",
            session.state.phase
        );

        Ok(step.effect)
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drops sessions untouched for longer than `max_idle`. Busy sessions are
    /// kept so an in-flight call can still land. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.state.phase.is_busy() || session.updated_at > cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle session(s), {} remaining", sessions.len());
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::DocumentPayload;
    use crate::workflow::machine::WorkflowError;

    #[tokio::test]
    async fn test_create_and_snapshot() {
        let store = SessionStore::new();
        let created = store.create().await;
        let fetched = store.snapshot(created.id).await.unwrap();
        assert_eq!(fetched.phase, Phase::Idle);
        assert!(!fetched.busy);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = SessionStore::new();
        assert!(matches!(
            store.snapshot(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.apply(Uuid::new_v4(), Event::Reset).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_event_leaves_state_untouched() {
        let store = SessionStore::new();
        let id = store.create().await.id;
        let before = store.snapshot(id).await.unwrap();

        let err = store.apply(id, Event::AnalyzeRequested).await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(WorkflowError::NoSource)));
        let after = store.snapshot(id).await.unwrap();
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_echo_document_body() {
        let store = SessionStore::new();
        let id = store.create().await.id;
        let source = ResumeSource::File(DocumentPayload {
            data: "JVBERi0xLjc=".to_string(),
            mime_type: "application/pdf".to_string(),
            name: "jane.pdf".to_string(),
        });
        store
            .apply(id, Event::SourceProvided { source, job_description: None })
            .await
            .unwrap();

        let snapshot = store.snapshot(id).await.unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "sourced");
        assert_eq!(json["source"]["kind"], "file");
        assert_eq!(json["source"]["name"], "jane.pdf");
        assert!(!json.to_string().contains("JVBERi0xLjc="));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        let id = store.create().await.id;
        store.remove(id).await.unwrap();
        assert!(store.remove(id).await.is_err());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_stale_sessions_only() {
        let store = SessionStore::new();
        let stale = store.create().await.id;
        let fresh = store.create().await.id;
        let busy = store.create().await.id;
        store
            .apply(
                busy,
                Event::SourceProvided {
                    source: ResumeSource::Text("Jane".to_string()),
                    job_description: None,
                },
            )
            .await
            .unwrap();
        store.apply(busy, Event::AnalyzeRequested).await.unwrap();

        {
            let mut sessions = store.inner.write().await;
            let two_hours_ago = Utc::now() - Duration::hours(2);
            sessions.get_mut(&stale).unwrap().updated_at = two_hours_ago;
            sessions.get_mut(&busy).unwrap().updated_at = two_hours_ago;
        }

        assert_eq!(store.evict_idle(Duration::hours(1)).await, 1);
        assert!(matches!(store.snapshot(stale).await, Err(AppError::NotFound(_))));
        assert!(store.snapshot(fresh).await.is_ok());
        assert_eq!(store.snapshot(busy).await.unwrap().phase, Phase::Analyzing);
        assert_eq!(store.evict_idle(Duration::hours(1)).await, 0);
    }
}
