//! Plain-text renderings of a draft.
//!
//! `revision_text` feeds the re-score call; `export_text` is the payload handed
//! to the external PDF renderer.

use std::fmt::Write as _;

use crate::models::resume::{ExperienceEntry, ResumeDraft};

/// Summary plus experience (role, company, date, bullets). Nothing else is
/// included: only these parts change in a revision.
pub fn revision_text(draft: &ResumeDraft) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "{}", draft.summary.trim());
    let _ = writeln!(out);
    let _ = writeln!(out, "EXPERIENCE");
    write_experience(&mut out, &draft.experience);
    out.trim_end().to_string()
}

/// The full draft as a plain-text resume.
pub fn export_text(draft: &ResumeDraft) -> String {
    let mut out = String::new();
    let info = &draft.personal_info;

    let _ = writeln!(out, "{}", info.name);
    if let Some(role) = info.role.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "{role}");
    }
    let contact: Vec<&str> = [Some(info.email.as_str()), Some(info.phone.as_str())]
        .into_iter()
        .chain([info.location.as_deref(), info.linkedin.as_deref()])
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    let _ = writeln!(out, "{}", contact.join(" | "));
    for link in info.links.iter().flatten() {
        let _ = writeln!(out, "{link}");
    }

    if !draft.summary.trim().is_empty() {
        let _ = writeln!(out, "\nSUMMARY");
        let _ = writeln!(out, "{}", draft.summary.trim());
    }

    if !draft.experience.is_empty() {
        let _ = writeln!(out, "\nEXPERIENCE");
        write_experience(&mut out, &draft.experience);
    }

    if !draft.education.is_empty() {
        let _ = writeln!(out, "\nEDUCATION");
        for entry in &draft.education {
            match entry.date.as_deref() {
                Some(date) => {
                    let _ = writeln!(out, "{}, {} ({date})", entry.degree, entry.institution);
                }
                None => {
                    let _ = writeln!(out, "{}, {}", entry.degree, entry.institution);
                }
            }
            if let Some(description) = entry.description.as_deref() {
                let _ = writeln!(out, "  {description}");
            }
        }
    }

    if !draft.skills.is_empty() {
        let _ = writeln!(out, "\nSKILLS");
        for skill in &draft.skills {
            let _ = writeln!(out, "{}: {}", skill.category, skill.items.join(", "));
        }
    }

    if !draft.certifications.is_empty() {
        let _ = writeln!(out, "\nCERTIFICATIONS");
        for cert in &draft.certifications {
            let _ = writeln!(out, "- {cert}");
        }
    }

    out
}

fn write_experience(out: &mut String, experience: &[ExperienceEntry]) {
    for entry in experience {
        match entry.date.as_deref() {
            Some(date) => {
                let _ = writeln!(out, "{} at {} ({date})", entry.role, entry.company);
            }
            None => {
                let _ = writeln!(out, "{} at {}", entry.role, entry.company);
            }
        }
        for bullet in &entry.bullets {
            let _ = writeln!(out, "- {bullet}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::fixtures::jane_doe_analysis;

    #[test]
    fn test_revision_text_has_only_summary_and_experience() {
        let draft = ResumeDraft::from_analysis(&jane_doe_analysis());
        let text = revision_text(&draft);
        assert_eq!(
            text,
            "SUMMARY\nBullets describe duties rather than outcomes.\n\nEXPERIENCE\nEngineer at Acme (2020 - Present)\n- Wrote code"
        );
        assert!(!text.contains("jane@x.com"));
    }

    #[test]
    fn test_export_text_keeps_section_order() {
        let draft = ResumeDraft::from_analysis(&jane_doe_analysis());
        let text = export_text(&draft);

        assert!(text.starts_with("Jane Doe\nSoftware Engineer\njane@x.com | 555-1234\n"));
        let positions: Vec<usize> = ["SUMMARY", "EXPERIENCE", "EDUCATION", "SKILLS"]
            .iter()
            .map(|h| text.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Languages: Python, Go"));
        assert!(!text.contains("CERTIFICATIONS"));
    }
}
