//! Revision: rewrites the summary and experience of an analysed resume into
//! action → result form, injecting the keywords and hard skills the analysis
//! found missing.
//!
//! Entry count and keyword coverage are requested, not enforced.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info};

use crate::llm_client::prompts::{
    fill_template, job_description_block, JSON_ONLY_SYSTEM, LOSSLESS_INSTRUCTION,
};
use crate::llm_client::{call_json, schema, GenerationRequest, GenerativeModel, LlmError};
use crate::models::resume::{AnalysisResult, RectifyResponse};
use crate::revision::prompts::{REVISION_PROMPT_TEMPLATE, REVISION_SYSTEM};

/// Runs one revision call. No retry: every failure is returned to the caller.
pub async fn revise(
    model: &dyn GenerativeModel,
    analysis: &AnalysisResult,
    job_description: Option<&str>,
) -> Result<RectifyResponse, LlmError> {
    let system = format!("{REVISION_SYSTEM} {JSON_ONLY_SYSTEM}");

    let request = GenerationRequest {
        system: &system,
        prompt: build_revision_prompt(analysis, job_description),
        document: None,
        response_schema: schema::rectify_response(),
    };

    let response: RectifyResponse = call_json(model, &request).await?;

    if response.revised_experience.len() != analysis.experience.len() {
        debug!(
            "Revision returned {} experience entries for {} inputs",
            response.revised_experience.len(),
            analysis.experience.len()
        );
    }

    info!(
        "Revision complete: {} experience entries, summary {} chars",
        response.revised_experience.len(),
        response.revised_summary.len()
    );

    Ok(response)
}

/// Missing keywords followed by hard-skill gaps, first occurrence wins
/// (case-insensitive).
pub fn keywords_to_inject(analysis: &AnalysisResult) -> Vec<&str> {
    let mut seen = HashSet::new();
    analysis
        .missing_keywords
        .iter()
        .chain(analysis.hard_skill_gaps.iter())
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .collect()
}

pub fn build_revision_prompt(analysis: &AnalysisResult, job_description: Option<&str>) -> String {
    let keywords = keywords_to_inject(analysis);
    let keywords = if keywords.is_empty() {
        "(none identified)".to_string()
    } else {
        keywords.join(", ")
    };

    let summary_target = match job_description.map(str::trim).filter(|jd| !jd.is_empty()) {
        Some(_) => " for the target job description",
        None => " for roles matching their experience",
    };

    let current_roles: Vec<String> = analysis
        .experience
        .iter()
        .filter(|entry| entry.is_current())
        .map(|entry| format!("{} at {}", entry.role, entry.company))
        .collect();
    let current_roles = if current_roles.is_empty() {
        "(none)".to_string()
    } else {
        current_roles.join("; ")
    };

    // Display with `#` pretty-prints and cannot fail.
    let experience_json = format!("{:#}", json!(analysis.experience));

    fill_template(
        REVISION_PROMPT_TEMPLATE,
        &[
            ("lossless_instruction", LOSSLESS_INSTRUCTION),
            ("keywords", keywords.as_str()),
            ("summary_target", summary_target),
            ("current_roles", current_roles.as_str()),
            ("job_description_block", job_description_block(job_description).as_str()),
            ("summary", analysis.impact_analysis.as_str()),
            ("experience_json", experience_json.as_str()),
        ],
    )
}
