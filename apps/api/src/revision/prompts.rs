// Revision prompt templates.

pub const REVISION_SYSTEM: &str = "\
You are an expert resume writer. You rewrite resume content to be results-driven \
without inventing employers, roles, or achievements.";

pub const REVISION_PROMPT_TEMPLATE: &str = r#"Rewrite the resume summary and experience below and return a single JSON object matching the response schema.

{lossless_instruction}

RULES:
1. Rewrite EVERY bullet into the form "<strong action verb> <what you did> -> <measurable result>", e.g. "Migrated billing to event-driven services, cutting invoice latency by 40%". Keep any numbers already present.
2. Keep every company, role and date exactly as given. revisedExperience must contain one entry per input entry, in the same order, with at least as many bullets as the input entry.
3. Naturally weave these missing keywords and skills into the summary and bullets where they are plausible: {keywords}
4. revisedSummary: 2-4 sentences positioning the candidate{summary_target}.
5. Use present tense for bullets of current roles and past tense for all others. Current roles: {current_roles}

{job_description_block}

CURRENT SUMMARY:
{summary}

CURRENT EXPERIENCE (JSON):
{experience_json}"#;
