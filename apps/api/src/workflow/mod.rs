// Orchestration Workflow: upload -> extract -> edit -> revise -> re-score -> export.
// `machine` is pure; `driver` performs the delegate calls; `sessions` holds state.

pub mod driver;
pub mod handlers;
pub mod machine;
pub mod render;
pub mod sessions;
