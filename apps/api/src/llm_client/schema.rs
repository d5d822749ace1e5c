//! Response schemas handed to the model as `responseSchema`.
//!
//! These mirror the serde types in `models::resume`: every field a type
//! deserializes without a default is listed in `required` here.

use serde_json::{json, Value};

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "STRING", "enum": values })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn personal_info() -> Value {
    object(
        json!({
            "name": string(),
            "role": string(),
            "email": string(),
            "phone": string(),
            "location": string(),
            "linkedin": string(),
            "links": array_of(string()),
        }),
        &["name", "email", "phone"],
    )
}

fn education_entry() -> Value {
    object(
        json!({
            "institution": string(),
            "degree": string(),
            "date": string(),
            "description": string(),
        }),
        &["institution", "degree"],
    )
}

fn experience_entry() -> Value {
    object(
        json!({
            "company": string(),
            "role": string(),
            "date": string(),
            "bullets": array_of(string()),
        }),
        &["company", "role", "bullets"],
    )
}

fn skill_category() -> Value {
    object(
        json!({
            "category": string(),
            "items": array_of(string()),
        }),
        &["category", "items"],
    )
}

fn annotation() -> Value {
    object(
        json!({
            "text_segment": string(),
            "critique": string(),
            "severity": string_enum(&["low", "medium", "high"]),
            "suggested_fix": string(),
        }),
        &["text_segment", "critique", "severity"],
    )
}

/// Schema for `AnalysisResult`.
pub fn analysis_result() -> Value {
    object(
        json!({
            "match_score": number(),
            "personal_info": personal_info(),
            "education": array_of(education_entry()),
            "experience": array_of(experience_entry()),
            "skills": array_of(skill_category()),
            "certifications": array_of(string()),
            "missing_keywords": array_of(string()),
            "hard_skill_gaps": array_of(string()),
            "soft_skill_gaps": array_of(string()),
            "formatting_issues": array_of(string()),
            "impact_analysis": string(),
            "impact_score": number(),
            "original_text": string(),
            "annotations": array_of(annotation()),
            "mode": string_enum(&["generalized", "specific"]),
        }),
        &[
            "match_score",
            "personal_info",
            "education",
            "experience",
            "skills",
            "certifications",
            "missing_keywords",
            "hard_skill_gaps",
            "soft_skill_gaps",
            "formatting_issues",
            "impact_analysis",
            "impact_score",
            "original_text",
            "annotations",
            "mode",
        ],
    )
}

/// Schema for `RectifyResponse`.
pub fn rectify_response() -> Value {
    object(
        json!({
            "revisedSummary": string(),
            "revisedExperience": array_of(experience_entry()),
        }),
        &["revisedSummary", "revisedExperience"],
    )
}
