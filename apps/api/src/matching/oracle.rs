//! ScoringOracleClient: one compatibility score per (candidate, job) pair.
//!
//! Flow per pair:
//! 1. Neither side has skills → `Failed`, nothing to score.
//! 2. One side has no skills → heuristic (always 0), no oracle call.
//! 3. Otherwise build a bounded prompt and call the oracle under `CallPolicy`.
//! 4. First integer in 0..=100 in the reply → `Scored`.
//! 5. Unparsable reply, exhausted retries or a non-retryable API error →
//!    heuristic score as `FallbackUsed`.
//!
//! Oracle trouble never surfaces as an error from `score`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm_client::extract::first_integer_in_range;
use crate::llm_client::prompts::{join_bounded, truncate_chars};
use crate::llm_client::{complete_with_retry, CallPolicy, CompletionOracle};
use crate::matching::heuristic::HeuristicScorer;
use crate::matching::prompts::{
    MAX_DESCRIPTION_CHARS, MAX_EXPERIENCE_CHARS, MAX_PROMPT_SKILLS, MAX_TITLE_CHARS,
    SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM,
};
use crate::models::job::JobPosting;
use crate::models::matching::MAX_SCORE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// A skill list was empty; the oracle was never asked.
    SparseInput,
    /// The oracle answered, but without a usable integer.
    UnparsableResponse,
    /// Timeouts, transport or API errors outlasted the retry budget.
    OracleUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    Scored(u8),
    FallbackUsed { score: u8, reason: FallbackReason },
    Failed(String),
}

impl ScoreOutcome {
    pub fn score(&self) -> Option<u8> {
        match self {
            ScoreOutcome::Scored(score) | ScoreOutcome::FallbackUsed { score, .. } => Some(*score),
            ScoreOutcome::Failed(_) => None,
        }
    }
}

pub struct ScoringOracleClient {
    oracle: Arc<dyn CompletionOracle>,
    policy: CallPolicy,
}

impl ScoringOracleClient {
    pub fn new(oracle: Arc<dyn CompletionOracle>, policy: CallPolicy) -> Self {
        Self { oracle, policy }
    }

    pub async fn score(
        &self,
        candidate_skills: &[String],
        experience_summary: &str,
        job: &JobPosting,
    ) -> ScoreOutcome {
        let job_skills = job.scoring_skills();

        if candidate_skills.is_empty() && job_skills.is_empty() {
            return ScoreOutcome::Failed("no skills on either side".to_string());
        }
        if candidate_skills.is_empty() || job_skills.is_empty() {
            debug!("Sparse input for job {}; skipping oracle", job.id);
            return ScoreOutcome::FallbackUsed {
                score: HeuristicScorer::score(candidate_skills, job_skills),
                reason: FallbackReason::SparseInput,
            };
        }

        let prompt = build_score_prompt(candidate_skills, experience_summary, job);
        let reason = match complete_with_retry(self.oracle.as_ref(), &prompt, SCORE_SYSTEM, &self.policy).await {
            Ok(reply) => match first_integer_in_range(&reply, MAX_SCORE) {
                Some(score) => {
                    debug!("Oracle scored job {} at {score}", job.id);
                    return ScoreOutcome::Scored(score);
                }
                None => {
                    warn!(
                        "Unparsable oracle score for job {}: {:?}",
                        job.id,
                        truncate_chars(&reply, 80)
                    );
                    FallbackReason::UnparsableResponse
                }
            },
            Err(e) => {
                warn!("Oracle unavailable for job {}, using heuristic: {e}", job.id);
                FallbackReason::OracleUnavailable
            }
        };

        ScoreOutcome::FallbackUsed {
            score: HeuristicScorer::score(candidate_skills, job_skills),
            reason,
        }
    }
}

/// Fills `SCORE_PROMPT_TEMPLATE` with every field cut to a fixed size, so the
/// prompt stays bounded however large the profile or posting is.
pub fn build_score_prompt(
    candidate_skills: &[String],
    experience_summary: &str,
    job: &JobPosting,
) -> String {
    let experience = match experience_summary.trim() {
        "" => "Not provided".to_string(),
        text => truncate_chars(text, MAX_EXPERIENCE_CHARS),
    };
    let description = match job.description.trim() {
        "" => "Not provided".to_string(),
        text => truncate_chars(text, MAX_DESCRIPTION_CHARS),
    };

    SCORE_PROMPT_TEMPLATE
        .replace("{candidate_skills}", &join_bounded(candidate_skills, MAX_PROMPT_SKILLS))
        .replace("{experience}", &experience)
        .replace("{job_title}", &truncate_chars(&job.title, MAX_TITLE_CHARS))
        .replace("{job_description}", &description)
        .replace("{job_skills}", &join_bounded(job.scoring_skills(), MAX_PROMPT_SKILLS))
}
