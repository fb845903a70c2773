use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::skills::normalize_skills;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    /// Part of the match cache key, so editing a posting invalidates its scores.
    pub updated_at: DateTime<Utc>,
}

impl JobPosting {
    /// Skills a candidate is scored against: the required set, or the
    /// preferred set for postings that list no hard requirements.
    pub fn scoring_skills(&self) -> &[String] {
        if self.required_skills.is_empty() {
            &self.preferred_skills
        } else {
            &self.required_skills
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobPostingRow> for JobPosting {
    fn from(row: JobPostingRow) -> Self {
        JobPosting {
            id: row.id,
            title: row.title.trim().to_string(),
            description: row.description.unwrap_or_default(),
            required_skills: normalize_skills(&row.required_skills),
            preferred_skills: normalize_skills(&row.preferred_skills.unwrap_or_default()),
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion_normalizes_skills() {
        let job = JobPosting::from(JobPostingRow {
            id: Uuid::new_v4(),
            title: "  Backend Engineer ".to_string(),
            description: None,
            required_skills: vec!["Go".to_string(), " go ".to_string(), "".to_string()],
            preferred_skills: None,
            updated_at: Utc::now(),
        });

        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.required_skills, vec!["Go"]);
        assert!(job.preferred_skills.is_empty());
        assert!(job.description.is_empty());
    }

    #[test]
    fn test_scoring_skills_fall_back_to_preferred() {
        let mut job = JobPosting {
            id: Uuid::new_v4(),
            title: "Data Engineer".to_string(),
            description: String::new(),
            required_skills: vec![],
            preferred_skills: vec!["Spark".to_string()],
            updated_at: Utc::now(),
        };
        assert_eq!(job.scoring_skills(), ["Spark".to_string()]);

        job.required_skills = vec!["SQL".to_string()];
        assert_eq!(job.scoring_skills(), ["SQL".to_string()]);
    }
}
