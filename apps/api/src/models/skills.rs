//! Skill list hygiene.
//!
//! Résumé parsers and profile forms hand us category headings ("Soft Skills"),
//! descriptive phrases ("proficient in Java") and whole sentences alongside
//! real skills. Those pollute both the oracle prompt and the heuristic overlap.

use std::collections::HashSet;

/// Longest string still treated as a skill.
pub const MAX_SKILL_LEN: usize = 30;

const CATEGORY_LABELS: &[&str] = &[
    "backend development",
    "frontend development",
    "front-end development",
    "back-end development",
    "full stack development",
    "fullstack development",
    "web development",
    "mobile development",
    "software development",
    "soft skills",
    "hard skills",
    "technical skills",
    "core competencies",
    "programming languages",
    "languages",
    "frameworks",
    "libraries",
    "tools",
    "technologies",
    "databases",
    "skills",
    "other",
    "misc",
];

const DESCRIPTIVE_PHRASES: &[&str] = &[
    "proficient in",
    "proficiency in",
    "experience with",
    "experience in",
    "experienced in",
    "familiar with",
    "familiarity with",
    "knowledge of",
    "expertise in",
    "skilled in",
    "years of",
    "ability to",
    "strong understanding",
    "working knowledge",
];

/// Trims bullets and separators, drops empties, and removes case-insensitive
/// duplicates keeping the first spelling. Order is preserved.
pub fn normalize_skills(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|s| {
            s.trim()
                .trim_start_matches(|c: char| matches!(c, '•' | '-' | '*' | '·'))
                .trim_end_matches(|c: char| matches!(c, ':' | ',' | ';'))
                .trim()
        })
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Returns true for strings that are headings or prose rather than skills.
pub fn is_skill_noise(skill: &str) -> bool {
    let lower = skill.trim().to_lowercase();
    if lower.is_empty() || lower.chars().count() > MAX_SKILL_LEN {
        return true;
    }
    if CATEGORY_LABELS.contains(&lower.as_str()) || lower.ends_with(" skills") {
        return true;
    }
    DESCRIPTIVE_PHRASES.iter().any(|p| lower.contains(p))
}

/// `normalize_skills` followed by removal of `is_skill_noise` entries.
pub fn filter_skill_noise(raw: &[String]) -> Vec<String> {
    normalize_skills(raw)
        .into_iter()
        .filter(|s| !is_skill_noise(s))
        .collect()
}
