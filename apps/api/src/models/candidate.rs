use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::skills::{filter_skill_noise, normalize_skills};

/// Marker for "which résumé content was this computed from".
/// Backed by the résumé record's last-modified timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentVersion(DateTime<Utc>);

impl ContentVersion {
    pub fn new(last_modified: DateTime<Utc>) -> Self {
        Self(last_modified)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.timestamp_micros())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub year: Option<String>,
}

/// A structured résumé profile. Built once from a `CandidateRow` and passed
/// around as a typed value; the scoring components never see raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    /// Ordered, de-duplicated.
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub summary: String,
    pub content_version: ContentVersion,
}

impl Candidate {
    /// Skills with category headings, prose and overlong strings removed.
    pub fn scoring_skills(&self) -> Vec<String> {
        filter_skill_noise(&self.skills)
    }

    /// One line per role: "Role at Company (duration): description".
    pub fn experience_summary(&self) -> String {
        self.experience
            .iter()
            .map(|e| {
                let mut line = match (e.role.trim(), e.company.trim()) {
                    ("", "") => "Role".to_string(),
                    (role, "") => role.to_string(),
                    ("", company) => format!("Role at {company}"),
                    (role, company) => format!("{role} at {company}"),
                };
                if !e.duration.trim().is_empty() {
                    line.push_str(&format!(" ({})", e.duration.trim()));
                }
                if !e.description.trim().is_empty() {
                    line.push_str(&format!(": {}", e.description.trim()));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// False when there is nothing at all to score or analyze. Skill noise
    /// alone does not count as content.
    pub fn has_content(&self) -> bool {
        !self.scoring_skills().is_empty()
            || !self.experience.is_empty()
            || !self.education.is_empty()
            || !self.summary.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub experience: Option<Value>,
    pub education: Option<Value>,
    pub summary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = AppError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        let experience = decode_entries(row.experience, row.id, "experience")?;
        let education = decode_entries(row.education, row.id, "education")?;

        Ok(Candidate {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            skills: normalize_skills(&row.skills),
            experience,
            education,
            summary: row.summary.unwrap_or_default(),
            content_version: ContentVersion::new(row.updated_at),
        })
    }
}

fn decode_entries<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    candidate_id: Uuid,
    field: &str,
) -> Result<Vec<T>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v).map_err(|e| {
            AppError::UnprocessableEntity(format!(
                "Candidate {candidate_id} has malformed {field} data: {e}"
            ))
        }),
    }
}
