// Extraction prompt templates.

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the resume provided {source_hint} and return a single JSON object matching the response schema.

{lossless_instruction}

EXTRACTION:
1. personal_info: name, email and phone are mandatory; include headline role, location, LinkedIn URL and any other links when present.
2. experience: one entry per role with company, role, date and EVERY bullet point verbatim.
3. education: one entry per institution with degree, date and any description.
4. skills: group every skill into logical categories (e.g. "Languages", "Frameworks", "Cloud & DevOps", "Soft Skills").
5. certifications: every certification, as written.
6. original_text: the full plain text of the resume.

DATES:
{date_instruction}

CRITIQUE:
7. match_score (0-100): {score_basis}
8. missing_keywords: important keywords {keyword_basis} that the resume lacks.
9. hard_skill_gaps and soft_skill_gaps: concrete technical and interpersonal gaps.
10. formatting_issues: layout, length, consistency and ATS-readability problems.
11. impact_analysis: a short narrative on how well the resume demonstrates measurable impact; impact_score (0-100) rates it.
12. annotations: quote exact text segments from the resume, critique each, give severity "low", "medium" or "high", and a suggested_fix where useful.

MODE:
13. mode must be exactly "{mode}".

{job_description_block}

{resume_block}"#;

pub const SCORE_BASIS_SPECIFIC: &str =
    "how well the resume matches the target job description's requirements, keywords and seniority.";

pub const SCORE_BASIS_GENERALIZED: &str =
    "no job description was supplied, so score against general resume best practices: formatting, clarity, quantified impact and ATS readability.";

pub const KEYWORD_BASIS_SPECIFIC: &str = "from the target job description";

pub const KEYWORD_BASIS_GENERALIZED: &str = "typically expected for the candidate's apparent role and seniority";

pub const ANALYSIS_SYSTEM: &str = "\
You are an expert resume reviewer and applicant-tracking-system specialist. \
You extract resumes losslessly into structured data and critique them honestly.";
