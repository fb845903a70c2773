//! MatchEngine: scores one subject against many counterparts.
//!
//! Every pair settles on its own: a failed or panicking pair becomes a
//! `ScoreSource::Failed` result and never cancels its siblings. At most
//! `EngineSettings::fan_out` pairs are in flight per call.
//!
//! Results are ordered by score, highest first. Pairs with no score sort
//! last. The sort is stable, so ties keep counterpart order.

use std::cmp::Reverse;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::cache::AnalysisCache;
use crate::matching::heuristic::HeuristicScorer;
use crate::matching::oracle::{FallbackReason, ScoreOutcome, ScoringOracleClient};
use crate::models::candidate::Candidate;
use crate::models::job::JobPosting;
use crate::models::matching::MatchRecord;

/// Placeholder score for a pair whose scoring failed outright.
pub const DEFAULT_FAILED_PAIR_SCORE: u8 = 10;
pub const DEFAULT_FAN_OUT: usize = 8;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fan_out: usize,
    /// `Some(n)`: failed pairs are shown with score `n`.
    /// `None`: failed pairs carry no score and sort last.
    pub failure_score: Option<u8>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fan_out: DEFAULT_FAN_OUT,
            failure_score: Some(DEFAULT_FAILED_PAIR_SCORE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Oracle,
    Cached,
    Heuristic,
    Failed,
}

/// What the match cache stores per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScore {
    pub score: u8,
    pub fallback_reason: Option<FallbackReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub score: Option<u8>,
    pub source: ScoreSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Job skills the candidate does not cover.
    pub missing_skills: Vec<String>,
}

impl ScoredResult {
    fn failed(candidate_id: Uuid, job_id: Uuid, reason: String, placeholder: Option<u8>) -> Self {
        Self {
            candidate_id,
            job_id,
            score: placeholder,
            source: ScoreSource::Failed,
            fallback_reason: None,
            failure: Some(reason),
            missing_skills: vec![],
        }
    }

    pub fn is_failed(&self) -> bool {
        self.source == ScoreSource::Failed
    }
}

/// Outcome of one engine call, one entry per counterpart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchRun {
    pub results: Vec<ScoredResult>,
}

impl MatchRun {
    pub fn failures(&self) -> impl Iterator<Item = &ScoredResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    /// Rows worth persisting. Failed pairs are left out so a placeholder
    /// never overwrites a real stored score.
    pub fn records(&self) -> Vec<MatchRecord> {
        self.results
            .iter()
            .filter(|r| !r.is_failed())
            .filter_map(|r| r.score.map(|score| MatchRecord::scored(r.candidate_id, r.job_id, score)))
            .collect()
    }
}

pub struct MatchEngine {
    scorer: ScoringOracleClient,
    cache: Arc<AnalysisCache<CachedScore>>,
    settings: EngineSettings,
}

impl MatchEngine {
    pub fn new(
        scorer: ScoringOracleClient,
        cache: Arc<AnalysisCache<CachedScore>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            scorer,
            cache,
            settings,
        }
    }

    pub async fn match_candidate_to_jobs(&self, candidate: &Candidate, jobs: &[JobPosting]) -> MatchRun {
        self.settle(jobs.iter().map(|job| (candidate, job)).collect())
            .await
    }

    pub async fn match_job_to_candidates(&self, job: &JobPosting, candidates: &[Candidate]) -> MatchRun {
        self.settle(candidates.iter().map(|candidate| (candidate, job)).collect())
            .await
    }

    /// Drops every cached score for this candidate against these jobs.
    pub async fn invalidate(&self, candidate_id: Uuid, jobs: &[JobPosting]) {
        for job in jobs {
            self.cache.invalidate(&cache_key(candidate_id, job)).await;
        }
    }

    async fn settle(&self, pairs: Vec<(&Candidate, &JobPosting)>) -> MatchRun {
        let placeholder = self.settings.failure_score;
        let pending: Vec<_> = pairs
            .into_iter()
            .map(|(candidate, job)| self.settle_pair(candidate, job, placeholder))
            .collect();
        let mut results: Vec<ScoredResult> = stream::iter(pending)
            .buffered(self.settings.fan_out.max(1))
            .collect()
            .await;

        results.sort_by_key(|r| Reverse(r.score));
        MatchRun { results }
    }

    async fn settle_pair(&self, candidate: &Candidate, job: &JobPosting, placeholder: Option<u8>) -> ScoredResult {
        match AssertUnwindSafe(self.score_pair(candidate, job))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                error!("Scoring panicked for candidate {} / job {}", candidate.id, job.id);
                ScoredResult::failed(
                    candidate.id,
                    job.id,
                    "scoring task panicked".to_string(),
                    placeholder,
                )
            }
        }
    }

    async fn score_pair(&self, candidate: &Candidate, job: &JobPosting) -> ScoredResult {
        let candidate_skills = candidate.scoring_skills();
        let missing_skills = HeuristicScorer::overlap(&candidate_skills, job.scoring_skills()).missing;
        let key = cache_key(candidate.id, job);

        if let Some(hit) = self.cache.get(&key, candidate.content_version).await {
            return ScoredResult {
                candidate_id: candidate.id,
                job_id: job.id,
                score: Some(hit.score),
                source: ScoreSource::Cached,
                fallback_reason: hit.fallback_reason,
                failure: None,
                missing_skills,
            };
        }

        let outcome = self
            .scorer
            .score(&candidate_skills, &candidate.experience_summary(), job)
            .await;

        let (score, source, fallback_reason) = match outcome {
            ScoreOutcome::Scored(score) => (score, ScoreSource::Oracle, None),
            ScoreOutcome::FallbackUsed { score, reason } => (score, ScoreSource::Heuristic, Some(reason)),
            ScoreOutcome::Failed(reason) => {
                warn!(
                    "No score for candidate {} / job {}: {reason}",
                    candidate.id, job.id
                );
                return ScoredResult::failed(candidate.id, job.id, reason, self.settings.failure_score);
            }
        };

        // Transient fallbacks are not cached, so the next call asks the oracle again.
        if matches!(fallback_reason, None | Some(FallbackReason::SparseInput)) {
            let entry = CachedScore {
                score,
                fallback_reason,
            };
            self.cache.set(&key, &entry, candidate.content_version).await;
            debug!("Cached score {score} for {key}");
        }

        ScoredResult {
            candidate_id: candidate.id,
            job_id: job.id,
            score: Some(score),
            source,
            fallback_reason,
            failure: None,
            missing_skills,
        }
    }
}

/// The job's `updated_at` is part of the key: editing a posting misses the cache.
fn cache_key(candidate_id: Uuid, job: &JobPosting) -> String {
    format!("{}:{}:{}", candidate_id, job.id, job.updated_at.timestamp_micros())
}
