//! Heuristic scorer: deterministic skill-overlap fallback, no I/O.
//!
//! Algorithm:
//! 1. Lowercase and trim both lists; blank entries are dropped.
//! 2. A job skill counts as matched when any candidate skill is a substring
//!    of it, or it is a substring of a candidate skill ("react" ~ "react.js").
//! 3. score = round(matched / job_skills × 100), clamped to 0..=100.
//! 4. Either list empty → 0.

use serde::{Deserialize, Serialize};

/// Which job skills the candidate covers, in job order and original spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillOverlap {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl SkillOverlap {
    pub fn score(&self) -> u8 {
        let total = self.matched.len() + self.missing.len();
        if total == 0 {
            return 0;
        }
        let ratio = self.matched.len() as f64 / total as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn overlap(candidate_skills: &[String], job_skills: &[String]) -> SkillOverlap {
        let candidate: Vec<String> = candidate_skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut overlap = SkillOverlap::default();
        for job_skill in job_skills {
            let needle = job_skill.trim().to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let covered = candidate
                .iter()
                .any(|c| c.contains(&needle) || needle.contains(c.as_str()));
            if covered {
                overlap.matched.push(job_skill.trim().to_string());
            } else {
                overlap.missing.push(job_skill.trim().to_string());
            }
        }
        overlap
    }

    pub fn score(candidate_skills: &[String], job_skills: &[String]) -> u8 {
        Self::overlap(candidate_skills, job_skills).score()
    }
}
