use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::GenerativeModel;
use crate::workflow::driver::WorkflowDriver;
use crate::workflow::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The generative model used by the stateless endpoints and the workflow.
    pub llm: Arc<dyn GenerativeModel>,
    pub workflow: WorkflowDriver,
    pub config: Config,
}

impl AppState {
    pub fn new(llm: Arc<dyn GenerativeModel>, config: Config) -> Self {
        Self {
            workflow: WorkflowDriver::new(llm.clone(), SessionStore::new()),
            llm,
            config,
        }
    }
}
