//! Extraction: turns a resume source and an optional job description into an
//! `AnalysisResult` via one schema-constrained model call.
//!
//! The returned `mode` is always the locally computed classification of the job
//! description; the model's own tag is only advisory.

use tracing::{info, warn};

use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, KEYWORD_BASIS_GENERALIZED, KEYWORD_BASIS_SPECIFIC,
    SCORE_BASIS_GENERALIZED, SCORE_BASIS_SPECIFIC,
};
use crate::llm_client::prompts::{
    fill_template, job_description_block, DATE_INSTRUCTION, JSON_ONLY_SYSTEM, LOSSLESS_INSTRUCTION,
};
use crate::llm_client::{call_json, schema, GenerationRequest, GenerativeModel, LlmError};
use crate::models::resume::{AnalysisMode, AnalysisResult, ResumeSource};

/// Runs one extraction call. No retry: every failure is returned to the caller.
pub async fn analyze(
    model: &dyn GenerativeModel,
    source: &ResumeSource,
    job_description: Option<&str>,
) -> Result<AnalysisResult, LlmError> {
    let mode = AnalysisMode::for_job_description(job_description);
    let system = format!("{ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}");

    let request = GenerationRequest {
        system: &system,
        prompt: build_analysis_prompt(source, job_description, mode),
        document: source.document(),
        response_schema: schema::analysis_result(),
    };

    let mut result: AnalysisResult = call_json(model, &request).await?;

    if result.mode != mode {
        warn!(
            "Model tagged analysis as '{}' but job description implies '{}'; keeping '{}'",
            result.mode.as_str(),
            mode.as_str(),
            mode.as_str()
        );
        result.mode = mode;
    }

    info!(
        "Analysis complete: mode={}, match_score={}, experience={}, education={}",
        result.mode.as_str(),
        result.match_score,
        result.experience.len(),
        result.education.len()
    );

    Ok(result)
}

/// Fills the extraction template for the given source and mode.
pub fn build_analysis_prompt(
    source: &ResumeSource,
    job_description: Option<&str>,
    mode: AnalysisMode,
) -> String {
    let (score_basis, keyword_basis) = match mode {
        AnalysisMode::Specific => (SCORE_BASIS_SPECIFIC, KEYWORD_BASIS_SPECIFIC),
        AnalysisMode::Generalized => (SCORE_BASIS_GENERALIZED, KEYWORD_BASIS_GENERALIZED),
    };

    let (source_hint, resume_block) = match source {
        ResumeSource::Text(text) => ("below", format!("RESUME TEXT:\n{text}")),
        ResumeSource::File(doc) => (
            "in the attached document",
            format!(
                "The resume is the attached document '{}' ({}).",
                doc.name, doc.mime_type
            ),
        ),
    };

    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("source_hint", source_hint),
            ("lossless_instruction", LOSSLESS_INSTRUCTION),
            ("date_instruction", DATE_INSTRUCTION),
            ("score_basis", score_basis),
            ("keyword_basis", keyword_basis),
            ("mode", mode.as_str()),
            ("job_description_block", job_description_block(job_description).as_str()),
            ("resume_block", resume_block.as_str()),
        ],
    )
}
