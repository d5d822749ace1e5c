// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only, matching the response schema exactly. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction against dropping content, shared by extraction and revision.
pub const LOSSLESS_INSTRUCTION: &str = "\
    CRITICAL: Do NOT summarize, merge, or omit anything. Every role, company, bullet point, \
    education entry, and skill in the input must appear in your output, in the original order. \
    Never truncate a sentence.";

/// Instruction for normalising dates on ongoing roles.
pub const DATE_INSTRUCTION: &str = "\
    Normalize dates to a consistent human-readable range such as 'Jan 2020 - Mar 2023'. \
    If a role is clearly the candidate's current position but shows an end date in the future, \
    replace that end date with 'Present'.";

/// Renders an optional job description block, or a placeholder when absent.
pub fn job_description_block(job_description: Option<&str>) -> String {
    match job_description.map(str::trim).filter(|jd| !jd.is_empty()) {
        Some(jd) => format!("TARGET JOB DESCRIPTION:\n{jd}"),
        None => "TARGET JOB DESCRIPTION: none supplied.".to_string(),
    }
}

/// Fills `{name}` placeholders in one left-to-right pass. Substituted values are
/// never rescanned, so braces inside resume or job-description text stay literal.
/// Unknown placeholders are left as they are.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = tail.find('}').and_then(|end| {
            values
                .iter()
                .find(|(key, _)| *key == &tail[1..end])
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
