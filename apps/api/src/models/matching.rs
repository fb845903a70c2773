use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

pub const MAX_SCORE: u8 = 100;

/// The candidate's decision on a match. Owned by the candidate, never by scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    Applied,
    Declined,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Applied => "applied",
            MatchStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "applied" => Ok(MatchStatus::Applied),
            "declined" => Ok(MatchStatus::Declined),
            other => Err(AppError::Validation(format!("Unknown match status '{other}'"))),
        }
    }
}

/// One row to write through `UpsertStore`. `status: None` means "leave the
/// stored status alone" (new rows start as pending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub score: u8,
    pub status: Option<MatchStatus>,
}

impl MatchRecord {
    pub fn scored(candidate_id: Uuid, job_id: Uuid, score: u8) -> Self {
        Self {
            candidate_id,
            job_id,
            score,
            status: None,
        }
    }

    pub fn key(&self) -> (Uuid, Uuid) {
        (self.candidate_id, self.job_id)
    }

    /// Rejects records that could only come from a caller bug.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.candidate_id.is_nil() || self.job_id.is_nil() {
            return Err(AppError::InvalidKey(format!(
                "nil id in composite key ({}, {})",
                self.candidate_id, self.job_id
            )));
        }
        if self.score > MAX_SCORE {
            return Err(AppError::InvalidKey(format!(
                "score {} out of range for ({}, {})",
                self.score, self.candidate_id, self.job_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchScoreRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub score: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
