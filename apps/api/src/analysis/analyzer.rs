//! ResumeAnalyzer: improvement suggestions for one résumé.
//!
//! Same shape as match scoring: cache check, oracle call under a
//! `CallPolicy`, deterministic fallback. Callers always get an analysis;
//! the only error is a profile that does not exist.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::defaults::default_analysis;
use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, MAX_EDUCATION_CHARS, MAX_EXPERIENCE_CHARS, MAX_PROMPT_SKILLS,
    MAX_SUMMARY_CHARS,
};
use crate::cache::AnalysisCache;
use crate::errors::AppError;
use crate::llm_client::extract::parse_json_lenient;
use crate::llm_client::prompts::{join_bounded, truncate_chars, JSON_ONLY_SYSTEM};
use crate::llm_client::{complete_with_retry, CallPolicy, CompletionOracle};
use crate::models::analysis::AnalysisResult;
use crate::models::candidate::Candidate;
use crate::store::ProfileStore;

pub const MAX_ITEMS_PER_LIST: usize = 10;
pub const MAX_ITEM_CHARS: usize = 300;

/// The three lists, as the oracle returns them and as the default builds them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisBody {
    pub suggestions: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl AnalysisBody {
    fn is_empty(&self) -> bool {
        self.suggestions.is_empty() && self.strengths.is_empty() && self.weaknesses.is_empty()
    }

    /// Trims, drops blanks and bounds list length and item size.
    fn sanitized(self) -> Self {
        fn clean(items: Vec<String>) -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .take(MAX_ITEMS_PER_LIST)
                .map(|s| truncate_chars(s, MAX_ITEM_CHARS))
                .collect()
        }
        Self {
            suggestions: clean(self.suggestions),
            strengths: clean(self.strengths),
            weaknesses: clean(self.weaknesses),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Oracle,
    Cached,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

pub struct ResumeAnalyzer {
    profiles: Arc<dyn ProfileStore>,
    oracle: Arc<dyn CompletionOracle>,
    policy: CallPolicy,
    cache: Arc<AnalysisCache<AnalysisResult>>,
}

impl ResumeAnalyzer {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        oracle: Arc<dyn CompletionOracle>,
        policy: CallPolicy,
        cache: Arc<AnalysisCache<AnalysisResult>>,
    ) -> Self {
        Self {
            profiles,
            oracle,
            policy,
            cache,
        }
    }

    pub async fn analyze(&self, candidate_id: Uuid) -> Result<AnalysisReport, AppError> {
        let candidate = self
            .profiles
            .candidate(candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
        Ok(self.analyze_candidate(&candidate).await)
    }

    pub async fn analyze_candidate(&self, candidate: &Candidate) -> AnalysisReport {
        let key = candidate.id.to_string();
        if let Some(result) = self.cache.get(&key, candidate.content_version).await {
            return AnalysisReport {
                result,
                source: AnalysisSource::Cached,
            };
        }

        if !candidate.has_content() {
            debug!("Candidate {} has an empty profile; using default analysis", candidate.id);
            return self.default_report(candidate);
        }

        let prompt = build_analysis_prompt(candidate);
        let reply = match complete_with_retry(self.oracle.as_ref(), &prompt, JSON_ONLY_SYSTEM, &self.policy).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Oracle unavailable for analysis of {}, using default: {e}", candidate.id);
                return self.default_report(candidate);
            }
        };

        let body = match parse_json_lenient::<AnalysisBody>(&reply).map(AnalysisBody::sanitized) {
            Some(body) if !body.is_empty() => body,
            _ => {
                warn!(
                    "Unusable analysis reply for {}: {:?}",
                    candidate.id,
                    truncate_chars(&reply, 120)
                );
                return self.default_report(candidate);
            }
        };

        let result = into_result(candidate, body);
        self.cache.set(&key, &result, candidate.content_version).await;
        AnalysisReport {
            result,
            source: AnalysisSource::Oracle,
        }
    }

    /// Drops the cached analysis, e.g. after a résumé re-upload.
    pub async fn invalidate(&self, candidate_id: Uuid) {
        self.cache.invalidate(&candidate_id.to_string()).await;
    }

    fn default_report(&self, candidate: &Candidate) -> AnalysisReport {
        AnalysisReport {
            result: into_result(candidate, default_analysis(candidate)),
            source: AnalysisSource::Default,
        }
    }
}

fn into_result(candidate: &Candidate, body: AnalysisBody) -> AnalysisResult {
    AnalysisResult {
        candidate_id: candidate.id,
        content_version: candidate.content_version,
        suggestions: body.suggestions,
        strengths: body.strengths,
        weaknesses: body.weaknesses,
        computed_at: Utc::now(),
    }
}

fn or_not_provided(text: String) -> String {
    if text.trim().is_empty() {
        "Not provided".to_string()
    } else {
        text
    }
}

pub fn build_analysis_prompt(candidate: &Candidate) -> String {
    let education = candidate
        .education
        .iter()
        .map(|e| {
            let mut line = format!("{} at {}", e.degree.trim(), e.institution.trim());
            if let Some(field) = e.field.as_deref().filter(|f| !f.trim().is_empty()) {
                line.push_str(&format!(", {}", field.trim()));
            }
            if let Some(year) = e.year.as_deref().filter(|y| !y.trim().is_empty()) {
                line.push_str(&format!(" ({})", year.trim()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    ANALYSIS_PROMPT_TEMPLATE
        .replace(
            "{skills}",
            &or_not_provided(join_bounded(&candidate.scoring_skills(), MAX_PROMPT_SKILLS)),
        )
        .replace(
            "{experience}",
            &or_not_provided(truncate_chars(&candidate.experience_summary(), MAX_EXPERIENCE_CHARS)),
        )
        .replace(
            "{education}",
            &or_not_provided(truncate_chars(&education, MAX_EDUCATION_CHARS)),
        )
        .replace(
            "{summary}",
            &or_not_provided(truncate_chars(candidate.summary.trim(), MAX_SUMMARY_CHARS)),
        )
}
