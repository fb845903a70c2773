//! Deterministic résumé analysis, served whenever the oracle cannot be used.
//!
//! A fixed baseline plus rule-based observations about missing or thin
//! sections. No I/O.

use crate::analysis::AnalysisBody;
use crate::models::candidate::Candidate;

/// Fewer scoring skills than this reads as a thin skills section.
pub const MIN_SKILLS: usize = 5;

const BASELINE_SUGGESTIONS: &[&str] = &[
    "Quantify achievements with concrete numbers (users, revenue, latency, team size)",
    "Start each bullet point with a strong action verb",
    "Tailor the skills section to the required skills of each job you apply for",
];

const BASELINE_WEAKNESSES: &[&str] = &["Impact of past work is hard to judge without measurable results"];

pub fn default_analysis(candidate: &Candidate) -> AnalysisBody {
    let mut body = AnalysisBody::default();
    let skills = candidate.scoring_skills();

    if skills.len() < MIN_SKILLS {
        body.weaknesses.push(match skills.len() {
            0 => "No skills listed".to_string(),
            n => format!("Skills section lists only {n} specific skills"),
        });
        body.suggestions.push(format!(
            "List at least {MIN_SKILLS} concrete technical skills (languages, frameworks, tools)"
        ));
    } else {
        body.strengths.push(format!("Lists {} specific skills", skills.len()));
    }

    if candidate.experience.is_empty() {
        body.weaknesses.push("No work experience listed".to_string());
        body.suggestions
            .push("Add work experience, including internships, freelance or open-source work".to_string());
    } else {
        let roles = candidate.experience.len();
        body.strengths.push(match roles {
            1 => "Includes one role with work history".to_string(),
            n => format!("Includes {n} roles with work history"),
        });
        let undescribed = candidate
            .experience
            .iter()
            .filter(|e| e.description.trim().is_empty())
            .count();
        if undescribed > 0 {
            body.suggestions.push(format!(
                "Describe responsibilities and results for {undescribed} of your {roles} roles"
            ));
        }
    }

    if candidate.summary.trim().is_empty() {
        body.suggestions
            .push("Add a two to three sentence professional summary at the top".to_string());
    } else {
        body.strengths.push("Has a professional summary".to_string());
    }

    if candidate.education.is_empty() {
        body.suggestions.push("Add your education, certifications or courses".to_string());
    }

    body.suggestions
        .extend(BASELINE_SUGGESTIONS.iter().map(|s| s.to_string()));
    body.weaknesses
        .extend(BASELINE_WEAKNESSES.iter().map(|s| s.to_string()));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{EducationEntry, ExperienceEntry};
    use crate::test_support::candidate;

    #[test]
    fn test_empty_profile_gets_every_section_suggestion() {
        let body = default_analysis(&candidate(&[]));

        assert!(body.weaknesses.contains(&"No skills listed".to_string()));
        assert!(body.weaknesses.contains(&"No work experience listed".to_string()));
        assert!(body.suggestions.iter().any(|s| s.contains("professional summary")));
        assert!(body.suggestions.iter().any(|s| s.contains("education")));
        assert!(body.strengths.is_empty());
    }

    #[test]
    fn test_complete_profile_earns_strengths() {
        let mut subject = candidate(&["Rust", "Go", "SQL", "Docker", "Kafka"]);
        subject.summary = "Backend engineer".to_string();
        subject.experience = vec![
            ExperienceEntry {
                company: "Acme".to_string(),
                role: "Engineer".to_string(),
                description: "Built billing".to_string(),
                ..Default::default()
            },
            ExperienceEntry {
                company: "Initech".to_string(),
                ..Default::default()
            },
        ];
        subject.education = vec![EducationEntry::default()];

        let body = default_analysis(&subject);

        assert!(body.strengths.contains(&"Lists 5 specific skills".to_string()));
        assert!(body.strengths.contains(&"Includes 2 roles with work history".to_string()));
        assert!(body
            .suggestions
            .contains(&"Describe responsibilities and results for 1 of your 2 roles".to_string()));
        assert!(!body.suggestions.iter().any(|s| s.contains("education")));
    }

    #[test]
    fn test_noise_does_not_count_as_skills() {
        let body = default_analysis(&candidate(&["Soft Skills", "Proficient in Java", "Go"]));
        assert!(body
            .weaknesses
            .contains(&"Skills section lists only 1 specific skills".to_string()));
    }

    #[test]
    fn test_baseline_is_always_present() {
        let body = default_analysis(&candidate(&["Go"]));
        for suggestion in BASELINE_SUGGESTIONS {
            assert!(body.suggestions.contains(&suggestion.to_string()));
        }
    }
}
