//! Workflow driver. Executes the effects the state machine asks for.
//!
//! Flow per request: apply event → run effect (delegate call, no lock held) →
//! apply the outcome event → repeat until no effect remains.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::extractor::analyze;
use crate::errors::AppError;
use crate::llm_client::{GenerativeModel, LlmError};
use crate::revision::rewriter::revise;
use crate::workflow::machine::{Effect, Event};
use crate::workflow::sessions::{SessionSnapshot, SessionStore};

#[derive(Clone)]
pub struct WorkflowDriver {
    model: Arc<dyn GenerativeModel>,
    sessions: SessionStore,
}

/// Result of one dispatched request.
#[derive(Debug)]
pub struct Dispatched {
    pub snapshot: SessionSnapshot,
    /// The delegate failure that ended the request early, if any. The session
    /// state already reflects it (`last_error`, phase rolled back).
    pub failure: Option<LlmError>,
}

impl Dispatched {
    /// Surfaces a step failure as an error, otherwise returns the snapshot.
    pub fn into_result(self) -> Result<SessionSnapshot, AppError> {
        match self.failure {
            Some(e) => Err(AppError::Llm(e)),
            None => Ok(self.snapshot),
        }
    }
}

impl WorkflowDriver {
    pub fn new(model: Arc<dyn GenerativeModel>, sessions: SessionStore) -> Self {
        Self { model, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Applies `event` to the session and runs every effect it leads to.
    ///
    /// The effect loop runs on its own task. If the caller is dropped mid-call
    /// (client disconnect, timeout) the loop still finishes and the session
    /// leaves its busy phase.
    pub async fn dispatch(&self, id: Uuid, event: Event) -> Result<Dispatched, AppError> {
        let failure = match self.sessions.apply(id, event).await? {
            Some(effect) => {
                let driver = self.clone();
                tokio::spawn(async move { driver.run_effects(id, effect).await })
                    .await
                    .map_err(|e| anyhow!("Workflow task for session {id} failed: {e}"))??
            }
            None => None,
        };

        Ok(Dispatched {
            snapshot: self.sessions.snapshot(id).await?,
            failure,
        })
    }

    async fn run_effects(&self, id: Uuid, effect: Effect) -> Result<Option<LlmError>, AppError> {
        let mut failure = None;
        let mut effect = Some(effect);

        while let Some(next) = effect {
            effect = match self.execute(id, next).await {
                Some((event, error)) => {
                    if error.is_some() {
                        failure = error;
                    }
                    self.sessions.apply(id, event).await?
                }
                None => None,
            };
        }

        Ok(failure)
    }

    /// Runs one effect. Delegate calls yield the follow-up event and, on
    /// failure, the error that caused it; notifications yield nothing.
    async fn execute(&self, id: Uuid, effect: Effect) -> Option<(Event, Option<LlmError>)> {
        let model = self.model.as_ref();
        let outcome = match effect {
            Effect::Analyze {
                source,
                job_description,
            } => {
                info!("Session {id}: analyzing resume");
                match analyze(model, &source, job_description.as_deref()).await {
                    Ok(result) => (Event::AnalysisSucceeded(result), None),
                    Err(e) => (Event::AnalysisFailed(e.to_string()), Some(e)),
                }
            }
            Effect::Revise {
                analysis,
                job_description,
            } => {
                info!("Session {id}: revising resume");
                match revise(model, &analysis, job_description.as_deref()).await {
                    Ok(revision) => (Event::RevisionSucceeded(revision), None),
                    Err(e) => (Event::RevisionFailed(e.to_string()), Some(e)),
                }
            }
            Effect::Rescore {
                source,
                job_description,
            } => {
                info!("Session {id}: re-scoring revised resume");
                match analyze(model, &source, job_description.as_deref()).await {
                    Ok(result) => (Event::RescoreSucceeded(result), None),
                    Err(e) => (Event::RescoreFailed(e.to_string()), Some(e)),
                }
            }
            Effect::Notify { message } => {
                warn!("Session {id}: {message}");
                return None;
            }
        };
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::GenerationRequest;
    use crate::models::resume::{fixtures::jane_doe_analysis, AnalysisMode, ResumeSource};
    use crate::workflow::machine::{Phase, WorkflowError};

    fn rewrite() -> serde_json::Value {
        json!({
            "revisedSummary": "Python engineer delivering measurable results on Kubernetes.",
            "revisedExperience": [{
                "company": "Acme",
                "role": "Engineer",
                "date": "2020 - Present",
                "bullets": ["Shipped Python services on Kubernetes, cutting incidents by 20%"]
            }]
        })
    }

    async fn sourced_session(model: ScriptedModel) -> (WorkflowDriver, Arc<ScriptedModel>, Uuid) {
        let model = Arc::new(model);
        let driver = WorkflowDriver::new(model.clone(), SessionStore::new());
        let id = driver.sessions().create().await.id;
        driver
            .dispatch(
                id,
                Event::SourceProvided {
                    source: ResumeSource::Text(
                        "Jane Doe, jane@x.com, 555-1234. Software Engineer at Acme 2020-2025. Built X."
                            .to_string(),
                    ),
                    job_description: None,
                },
            )
            .await
            .unwrap();
        (driver, model, id)
    }

    #[tokio::test]
    async fn test_analyze_then_revise_full_cycle() {
        let mut rescored = jane_doe_analysis();
        rescored.match_score = 91.0;
        rescored.missing_keywords.clear();
        let (driver, model, id) = sourced_session(
            ScriptedModel::new()
                .reply_json(&jane_doe_analysis())
                .reply(rewrite().to_string())
                .reply_json(&rescored),
        )
        .await;

        let analyzed = driver
            .dispatch(id, Event::AnalyzeRequested)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(analyzed.phase, Phase::Analyzed);
        assert_eq!(analyzed.analysis.as_ref().unwrap().mode, AnalysisMode::Generalized);
        assert_eq!(analyzed.baseline_score, Some(62.0));

        let revised = driver
            .dispatch(id, Event::ReviseRequested)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(revised.phase, Phase::Analyzed);
        let analysis = revised.analysis.unwrap();
        assert_eq!(analysis.match_score, 91.0);
        assert_eq!(analysis.missing_keywords, vec!["Kubernetes".to_string()]);
        assert_eq!(revised.baseline_score, Some(62.0));
        let draft = revised.draft.unwrap();
        assert!(draft.summary.starts_with("Python engineer"));
        assert_eq!(draft.experience[0].company, "Acme");

        let calls = model.calls();
        assert_eq!(calls.len(), 3);
        // The re-score is a text-only extraction over the revised content.
        assert!(calls[2].document_mime_type.is_none());
        assert!(calls[2].prompt.contains("Shipped Python services on Kubernetes"));
    }

    #[tokio::test]
    async fn test_rescore_failure_surfaces_error_but_keeps_revision() {
        let (driver, _model, id) = sourced_session(
            ScriptedModel::new()
                .reply_json(&jane_doe_analysis())
                .reply(rewrite().to_string())
                .fail(LlmError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
        )
        .await;
        driver.dispatch(id, Event::AnalyzeRequested).await.unwrap();

        let dispatched = driver.dispatch(id, Event::ReviseRequested).await.unwrap();

        assert!(matches!(dispatched.failure, Some(LlmError::Api { status: 503, .. })));
        let snapshot = dispatched.snapshot;
        assert_eq!(snapshot.phase, Phase::Analyzed);
        assert_eq!(snapshot.analysis.unwrap().match_score, 62.0);
        assert!(snapshot.draft.unwrap().summary.starts_with("Python engineer"));
        assert!(snapshot.last_error.unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_failed_analysis_returns_to_sourced() {
        let (driver, _model, id) =
            sourced_session(ScriptedModel::new().fail(LlmError::MissingCredential)).await;

        let dispatched = driver.dispatch(id, Event::AnalyzeRequested).await.unwrap();

        assert!(matches!(dispatched.failure, Some(LlmError::MissingCredential)));
        assert_eq!(dispatched.snapshot.phase, Phase::Sourced);
        assert!(dispatched.snapshot.analysis.is_none());
        assert!(matches!(
            dispatched.into_result(),
            Err(AppError::Llm(LlmError::MissingCredential))
        ));
    }

    #[tokio::test]
    async fn test_malformed_revision_changes_nothing() {
        let (driver, model, id) = sourced_session(
            ScriptedModel::new()
                .reply_json(&jane_doe_analysis())
                .reply(r#"{"revisedSummary": "only half"}"#),
        )
        .await;
        let before = driver
            .dispatch(id, Event::AnalyzeRequested)
            .await
            .unwrap()
            .snapshot;

        let dispatched = driver.dispatch(id, Event::ReviseRequested).await.unwrap();

        assert!(matches!(dispatched.failure, Some(LlmError::MalformedResponse(_))));
        assert_eq!(dispatched.snapshot.draft, before.draft);
        assert_eq!(dispatched.snapshot.analysis, before.analysis);
        // No re-score after a failed revision.
        assert_eq!(model.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_after_analysis_clears_session() {
        let (driver, _model, id) =
            sourced_session(ScriptedModel::new().reply_json(&jane_doe_analysis())).await;
        driver.dispatch(id, Event::AnalyzeRequested).await.unwrap();

        let snapshot = driver
            .dispatch(id, Event::Reset)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(snapshot.source.is_none());
        assert!(snapshot.analysis.is_none());
        assert!(snapshot.draft.is_none());
        assert!(snapshot.baseline_score.is_none());
    }

    #[tokio::test]
    async fn test_revise_before_analysis_is_conflict() {
        let (driver, model, id) = sourced_session(ScriptedModel::new()).await;
        let err = driver.dispatch(id, Event::ReviseRequested).await.unwrap_err();
        assert!(matches!(err, AppError::Workflow(WorkflowError::NoAnalysis)));
        assert!(model.calls().is_empty());
    }

    /// Holds every call until the test opens the gate.
    struct GatedModel {
        gate: Notify,
        reply: String,
    }

    #[async_trait]
    impl GenerativeModel for GatedModel {
        async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, LlmError> {
            self.gate.notified().await;
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_dropped_request_still_completes_the_call() {
        let model = Arc::new(GatedModel {
            gate: Notify::new(),
            reply: serde_json::to_string(&jane_doe_analysis()).unwrap(),
        });
        let driver = WorkflowDriver::new(model.clone(), SessionStore::new());
        let id = driver.sessions().create().await.id;
        driver
            .dispatch(
                id,
                Event::SourceProvided {
                    source: ResumeSource::Text("Jane Doe, jane@x.com".to_string()),
                    job_description: None,
                },
            )
            .await
            .unwrap();

        // The caller gives up while the model call is still pending.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), driver.dispatch(id, Event::AnalyzeRequested))
                .await;
        assert!(abandoned.is_err());
        let in_flight = driver.sessions().snapshot(id).await.unwrap();
        assert_eq!(in_flight.phase, Phase::Analyzing);
        assert!(in_flight.busy);

        model.gate.notify_one();
        let mut settled = in_flight;
        for _ in 0..100 {
            settled = driver.sessions().snapshot(id).await.unwrap();
            if !settled.busy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(settled.phase, Phase::Analyzed);
        assert_eq!(settled.baseline_score, Some(62.0));

        let reset = driver
            .dispatch(id, Event::Reset)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(reset.phase, Phase::Idle);
    }
}
