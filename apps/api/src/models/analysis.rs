use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::candidate::ContentVersion;

/// Résumé improvement analysis for one candidate, pinned to the content it
/// was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub candidate_id: Uuid,
    pub content_version: ContentVersion,
    pub suggestions: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub computed_at: DateTime<Utc>,
}
