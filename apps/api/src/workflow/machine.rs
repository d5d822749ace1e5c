//! Workflow state machine: pure `(state, event) -> (state, effect)` transitions.
//!
//! Nothing here performs I/O. Effects describe the delegate calls to make; the
//! driver executes them and feeds the outcome back as the next event.
//!
//! # Phases
//! ```text
//! idle ──source──▶ sourced ──analyze──▶ analyzing ──ok──▶ analyzed ──revise──▶ revising
//!                     ▲                    │ err                ▲                 │ ok
//!                     └────────────────────┘                    │                 ▼
//!                                                               └──(re-score)── revised
//! ```
//! `analyzing`, `revising` and `revised` are busy: request events are rejected
//! until the in-flight call completes.
//!
//! # Update policy
//! Analysis and draft are only ever replaced wholesale. The one exception is the
//! re-score after a revision, which overwrites `analysis.match_score` and nothing else.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::resume::{
    AnalysisResult, DraftSection, RectifyResponse, ResumeDraft, ResumeSource,
};
use crate::workflow::render::revision_text;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Sourced,
    Analyzing,
    Analyzed,
    Revising,
    /// Draft already carries the revision; re-score in flight.
    Revised,
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Analyzing | Phase::Revising | Phase::Revised)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Sourced => "sourced",
            Phase::Analyzing => "analyzing",
            Phase::Analyzed => "analyzed",
            Phase::Revising => "revising",
            Phase::Revised => "revised",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one workflow instance holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    pub phase: Phase,
    pub source: Option<ResumeSource>,
    pub job_description: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub draft: Option<ResumeDraft>,
    /// Score of the first extraction, kept for before/after comparison.
    pub baseline_score: Option<f64>,
    /// Message of the most recent failed step, cleared by the next request.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// `job_description: None` leaves the stored one untouched.
    SourceProvided {
        source: ResumeSource,
        job_description: Option<String>,
    },
    /// `None` or blank clears the job description.
    JobDescriptionChanged(Option<String>),
    AnalyzeRequested,
    AnalysisSucceeded(AnalysisResult),
    AnalysisFailed(String),
    DraftEdited(DraftSection),
    ReviseRequested,
    RevisionSucceeded(RectifyResponse),
    RevisionFailed(String),
    RescoreSucceeded(AnalysisResult),
    RescoreFailed(String),
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SourceProvided { .. } => "source_provided",
            Event::JobDescriptionChanged(_) => "job_description_changed",
            Event::AnalyzeRequested => "analyze_requested",
            Event::AnalysisSucceeded(_) => "analysis_succeeded",
            Event::AnalysisFailed(_) => "analysis_failed",
            Event::DraftEdited(_) => "draft_edited",
            Event::ReviseRequested => "revise_requested",
            Event::RevisionSucceeded(_) => "revision_succeeded",
            Event::RevisionFailed(_) => "revision_failed",
            Event::RescoreSucceeded(_) => "rescore_succeeded",
            Event::RescoreFailed(_) => "rescore_failed",
            Event::Reset => "reset",
        }
    }

    /// Events that come from the user rather than from a completed call.
    fn is_request(&self) -> bool {
        matches!(
            self,
            Event::SourceProvided { .. }
                | Event::JobDescriptionChanged(_)
                | Event::AnalyzeRequested
                | Event::DraftEdited(_)
                | Event::ReviseRequested
                | Event::Reset
        )
    }
}

/// Side effect requested by a transition, executed by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Analyze {
        source: ResumeSource,
        job_description: Option<String>,
    },
    Revise {
        analysis: AnalysisResult,
        job_description: Option<String>,
    },
    /// Extraction over the revised text, used only for its `match_score`.
    Rescore {
        source: ResumeSource,
        job_description: Option<String>,
    },
    Notify {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("a request is already in flight (phase: {phase})")]
    Busy { phase: Phase },

    #[error("event '{event}' is not valid in phase '{phase}'")]
    InvalidTransition { phase: Phase, event: &'static str },

    #[error("no resume has been provided")]
    NoSource,

    #[error("no analysis yet; analyze the resume first")]
    NoAnalysis,
}

#[derive(Debug)]
pub struct Transition {
    pub state: WorkflowState,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(state: WorkflowState) -> Self {
        Self { state, effect: None }
    }

    fn with(state: WorkflowState, effect: Effect) -> Self {
        Self {
            state,
            effect: Some(effect),
        }
    }
}

fn normalize_job_description(job_description: Option<String>) -> Option<String> {
    job_description.filter(|jd| !jd.trim().is_empty())
}

/// Applies one event. The input state is never modified; on error the caller
/// keeps it as-is.
pub fn transition(state: &WorkflowState, event: Event) -> Result<Transition, WorkflowError> {
    if state.phase.is_busy() && event.is_request() {
        return Err(WorkflowError::Busy { phase: state.phase });
    }

    let mut next = state.clone();
    let invalid = |event: &Event| WorkflowError::InvalidTransition {
        phase: state.phase,
        event: event.name(),
    };

    match event {
        Event::Reset => Ok(Transition::to(WorkflowState::default())),

        Event::SourceProvided {
            source,
            job_description,
        } => {
            next.source = Some(source);
            if job_description.is_some() {
                next.job_description = normalize_job_description(job_description);
            }
            next.phase = if next.analysis.is_some() {
                Phase::Analyzed
            } else {
                Phase::Sourced
            };
            next.last_error = None;
            Ok(Transition::to(next))
        }

        Event::JobDescriptionChanged(job_description) => {
            next.job_description = normalize_job_description(job_description);
            Ok(Transition::to(next))
        }

        Event::AnalyzeRequested => {
            let source = state.source.clone().ok_or(WorkflowError::NoSource)?;
            next.phase = Phase::Analyzing;
            next.last_error = None;
            let effect = Effect::Analyze {
                source,
                job_description: state.job_description.clone(),
            };
            Ok(Transition::with(next, effect))
        }

        Event::AnalysisSucceeded(result) if state.phase == Phase::Analyzing => {
            next.baseline_score = Some(
                state
                    .analysis
                    .as_ref()
                    .map(|previous| previous.match_score)
                    .unwrap_or(result.match_score),
            );
            next.draft = Some(ResumeDraft::from_analysis(&result));
            next.analysis = Some(result);
            next.phase = Phase::Analyzed;
            Ok(Transition::to(next))
        }

        Event::AnalysisFailed(message) if state.phase == Phase::Analyzing => {
            next.phase = if state.analysis.is_some() {
                Phase::Analyzed
            } else {
                Phase::Sourced
            };
            Ok(failed(next, "Analysis failed", message))
        }

        Event::DraftEdited(section) => {
            if state.phase != Phase::Analyzed {
                return Err(WorkflowError::NoAnalysis);
            }
            let draft = next.draft.as_mut().ok_or(WorkflowError::NoAnalysis)?;
            draft.replace(section);
            Ok(Transition::to(next))
        }

        Event::ReviseRequested => {
            if state.phase != Phase::Analyzed {
                return Err(WorkflowError::NoAnalysis);
            }
            let analysis = state.analysis.clone().ok_or(WorkflowError::NoAnalysis)?;
            next.phase = Phase::Revising;
            next.last_error = None;
            let effect = Effect::Revise {
                analysis,
                job_description: state.job_description.clone(),
            };
            Ok(Transition::with(next, effect))
        }

        Event::RevisionSucceeded(revision) if state.phase == Phase::Revising => {
            let draft = next.draft.as_mut().ok_or(WorkflowError::NoAnalysis)?;
            draft.apply_revision(revision);
            let rescore_text = revision_text(draft);
            next.phase = Phase::Revised;
            let effect = Effect::Rescore {
                source: ResumeSource::Text(rescore_text),
                job_description: state.job_description.clone(),
            };
            Ok(Transition::with(next, effect))
        }

        Event::RevisionFailed(message) if state.phase == Phase::Revising => {
            next.phase = Phase::Analyzed;
            Ok(failed(next, "Revision failed", message))
        }

        Event::RescoreSucceeded(result) if state.phase == Phase::Revised => {
            let analysis = next.analysis.as_mut().ok_or(WorkflowError::NoAnalysis)?;
            analysis.match_score = result.match_score;
            next.phase = Phase::Analyzed;
            Ok(Transition::to(next))
        }

        Event::RescoreFailed(message) if state.phase == Phase::Revised => {
            // The revised draft stays; only the score update is lost.
            next.phase = Phase::Analyzed;
            Ok(failed(next, "Re-scoring the revised resume failed", message))
        }

        other => Err(invalid(&other)),
    }
}

fn failed(mut state: WorkflowState, step: &str, message: String) -> Transition {
    let message = format!("{step}: {message}");
    state.last_error = Some(message.clone());
    Transition::with(state, Effect::Notify { message })
}
