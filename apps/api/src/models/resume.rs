use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// End-date sentinel for an ongoing role.
pub const PRESENT: &str = "Present";

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// The resume being analysed: pasted text or an uploaded document, never both.
///
/// Wire form is `{"text": "..."}` or `{"file": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSource {
    Text(String),
    File(DocumentPayload),
}

/// An uploaded document, carried as base64 so it can travel inside JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// Standard-alphabet base64 of the document bytes.
    pub data: String,
    pub mime_type: String,
    pub name: String,
}

impl DocumentPayload {
    pub fn from_bytes(bytes: &Bytes, mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }
}

impl ResumeSource {
    /// Checks the source carries something worth sending to the model.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ResumeSource::Text(text) if text.trim().is_empty() => {
                Err("resume text cannot be empty".to_string())
            }
            ResumeSource::File(doc) if doc.data.trim().is_empty() => {
                Err(format!("uploaded document '{}' is empty", doc.name))
            }
            ResumeSource::File(doc) if doc.mime_type.trim().is_empty() => {
                Err(format!("uploaded document '{}' has no media type", doc.name))
            }
            ResumeSource::File(doc) => STANDARD
                .decode(doc.data.as_bytes())
                .map(|_| ())
                .map_err(|e| format!("uploaded document '{}' is not valid base64: {e}", doc.name)),
            ResumeSource::Text(_) => Ok(()),
        }
    }

    pub fn document(&self) -> Option<&DocumentPayload> {
        match self {
            ResumeSource::File(doc) => Some(doc),
            ResumeSource::Text(_) => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extracted resume sections
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    /// Headline role, e.g. "Senior Backend Engineer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    /// Free-form range such as "2020 - Present".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub bullets: Vec<String>,
}

impl ExperienceEntry {
    /// True when the date range ends with the `Present` sentinel.
    pub fn is_current(&self) -> bool {
        self.date
            .as_deref()
            .map(|date| date.trim_end().ends_with(PRESENT))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A critique pinned to a segment of the original resume text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text_segment: String,
    pub critique: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis output
// ────────────────────────────────────────────────────────────────────────────

/// Whether an analysis was run against a target job description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Generalized,
    Specific,
}

impl AnalysisMode {
    /// `Specific` iff a job description is present and not blank.
    pub fn for_job_description(job_description: Option<&str>) -> Self {
        match job_description {
            Some(jd) if !jd.trim().is_empty() => AnalysisMode::Specific,
            _ => AnalysisMode::Generalized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Generalized => "generalized",
            AnalysisMode::Specific => "specific",
        }
    }
}

/// Full structured output of one extraction call.
///
/// Every field is required on the wire; a payload missing any of them is
/// rejected rather than defaulted. Scores are advisory and never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub match_score: f64,
    pub personal_info: PersonalInfo,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub skills: Vec<SkillCategory>,
    pub certifications: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub hard_skill_gaps: Vec<String>,
    pub soft_skill_gaps: Vec<String>,
    pub formatting_issues: Vec<String>,
    pub impact_analysis: String,
    pub impact_score: f64,
    pub original_text: String,
    pub annotations: Vec<Annotation>,
    pub mode: AnalysisMode,
}

/// Output of one revision call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectifyResponse {
    pub revised_summary: String,
    pub revised_experience: Vec<ExperienceEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Editable draft
// ────────────────────────────────────────────────────────────────────────────

/// The user-editable working copy of the resume.
///
/// Only ever changed by replacing a whole section: see [`DraftSection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeDraft {
    pub personal_info: PersonalInfo,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub skills: Vec<SkillCategory>,
    pub certifications: Vec<String>,
    pub summary: String,
}

/// One replaceable section of a draft, as sent by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "value", rename_all = "snake_case")]
pub enum DraftSection {
    PersonalInfo(PersonalInfo),
    Education(Vec<EducationEntry>),
    Experience(Vec<ExperienceEntry>),
    Skills(Vec<SkillCategory>),
    Certifications(Vec<String>),
    Summary(String),
}

impl ResumeDraft {
    /// Builds a fresh draft from an analysis. The summary starts as the
    /// impact narrative, which is also what revision rewrites.
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        Self {
            personal_info: analysis.personal_info.clone(),
            education: analysis.education.clone(),
            experience: analysis.experience.clone(),
            skills: analysis.skills.clone(),
            certifications: analysis.certifications.clone(),
            summary: analysis.impact_analysis.clone(),
        }
    }

    /// Replaces the revised parts; everything else stays as extracted.
    pub fn apply_revision(&mut self, revision: RectifyResponse) {
        self.summary = revision.revised_summary;
        self.experience = revision.revised_experience;
    }

    pub fn replace(&mut self, section: DraftSection) {
        match section {
            DraftSection::PersonalInfo(v) => self.personal_info = v,
            DraftSection::Education(v) => self.education = v,
            DraftSection::Experience(v) => self.experience = v,
            DraftSection::Skills(v) => self.skills = v,
            DraftSection::Certifications(v) => self.certifications = v,
            DraftSection::Summary(v) => self.summary = v,
        }
    }
}
