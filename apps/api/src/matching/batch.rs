//! BatchCoordinator: reconciles stored match scores for many entities.
//!
//! Entities are processed in chunks: concurrently within a chunk, one chunk
//! after another. The chunk size caps how many engine calls (and so how many
//! oracle calls) can be in flight at once.
//!
//! An entity that fails (missing profile, store write error) is logged,
//! reported in `ReconcileReport::failures` and skipped. An entity whose rows
//! were only partly written is reported as a failure too, but the rows that
//! did land are counted. Counts only reflect rows that were actually written.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::{MatchEngine, MatchRun};
use crate::models::candidate::Candidate;
use crate::models::job::JobPosting;
use crate::store::{ProfileStore, UpsertCounts, UpsertStore};

pub const DEFAULT_BATCH_CHUNK_SIZE: usize = 5;

/// Which side of the match table a run is driven from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileTarget {
    Candidates,
    Jobs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFailure {
    pub entity_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    /// Entities whose scores were written.
    pub processed: usize,
    /// Pairs that could not be scored and were not written.
    pub failed_pairs: usize,
    pub failures: Vec<EntityFailure>,
}

struct EntityOutcome {
    counts: UpsertCounts,
    failed_pairs: usize,
    /// Set when some of the entity's rows could not be written.
    write_error: Option<String>,
}

enum Counterparts {
    Jobs(Vec<JobPosting>),
    Candidates(Vec<Candidate>),
}

pub struct BatchCoordinator {
    profiles: Arc<dyn ProfileStore>,
    engine: Arc<MatchEngine>,
    upserts: Arc<UpsertStore>,
    default_chunk_size: usize,
}

impl BatchCoordinator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        engine: Arc<MatchEngine>,
        upserts: Arc<UpsertStore>,
        default_chunk_size: usize,
    ) -> Self {
        Self {
            profiles,
            engine,
            upserts,
            default_chunk_size: default_chunk_size.max(1),
        }
    }

    pub fn default_chunk_size(&self) -> usize {
        self.default_chunk_size
    }

    /// Reconciles every candidate or every job posting in the store.
    pub async fn reconcile_everything(
        &self,
        target: ReconcileTarget,
        chunk_size: usize,
    ) -> Result<ReconcileReport, AppError> {
        let ids = match target {
            ReconcileTarget::Candidates => self.profiles.candidate_ids().await?,
            ReconcileTarget::Jobs => self.profiles.job_ids().await?,
        };
        self.reconcile_all(target, &ids, chunk_size).await
    }

    /// Scores each entity in `entity_ids` against every counterpart and
    /// upserts the results.
    ///
    /// Errors only when the run cannot start: a zero chunk size, or the
    /// counterpart list cannot be loaded. Per-entity failures never abort it.
    pub async fn reconcile_all(
        &self,
        target: ReconcileTarget,
        entity_ids: &[Uuid],
        chunk_size: usize,
    ) -> Result<ReconcileReport, AppError> {
        if chunk_size == 0 {
            return Err(AppError::Validation("chunk_size must be greater than zero".to_string()));
        }

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = entity_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut report = ReconcileReport::default();
        if ids.is_empty() {
            return Ok(report);
        }

        let counterparts = match target {
            ReconcileTarget::Candidates => Counterparts::Jobs(self.profiles.jobs().await?),
            ReconcileTarget::Jobs => Counterparts::Candidates(self.profiles.candidates().await?),
        };

        let total_chunks = ids.len().div_ceil(chunk_size);
        for (index, chunk) in ids.chunks(chunk_size).enumerate() {
            let outcomes = join_all(chunk.iter().map(|id| self.reconcile_one(*id, &counterparts))).await;

            for (id, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(outcome) => {
                        report.created += outcome.counts.created;
                        report.updated += outcome.counts.updated;
                        report.failed_pairs += outcome.failed_pairs;
                        match outcome.write_error {
                            None => report.processed += 1,
                            Some(reason) => {
                                warn!("Partial write for {id} during reconciliation: {reason}");
                                report.failures.push(EntityFailure {
                                    entity_id: *id,
                                    reason,
                                });
                            }
                        }
                    }
                    Err(e) => {
                        if matches!(e, AppError::InvalidKey(_)) {
                            error!("Reconciliation of {id} produced an invalid record: {e}");
                        } else {
                            warn!("Skipping {id} during reconciliation: {e}");
                        }
                        report.failures.push(EntityFailure {
                            entity_id: *id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            info!(
                "Reconciled chunk {}/{} ({} entities)",
                index + 1,
                total_chunks,
                chunk.len()
            );
        }

        info!(
            "Reconciliation finished: {} processed, {} failed, {} created, {} updated",
            report.processed,
            report.failures.len(),
            report.created,
            report.updated
        );
        Ok(report)
    }

    async fn reconcile_one(&self, id: Uuid, counterparts: &Counterparts) -> Result<EntityOutcome, AppError> {
        let run = match counterparts {
            Counterparts::Jobs(jobs) => {
                let candidate = self
                    .profiles
                    .candidate(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))?;
                self.engine.match_candidate_to_jobs(&candidate, jobs).await
            }
            Counterparts::Candidates(candidates) => {
                let job = self
                    .profiles
                    .job(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Job posting {id} not found")))?;
                self.engine.match_job_to_candidates(&job, candidates).await
            }
        };
        self.persist(run).await
    }

    async fn persist(&self, run: MatchRun) -> Result<EntityOutcome, AppError> {
        let records = run.records();
        let written = self.upserts.upsert(&records).await?;
        let write_error = written.failures.first().map(|first| {
            format!(
                "{} of {} match rows not stored: {}",
                written.failures.len(),
                records.len(),
                first.reason
            )
        });
        Ok(EntityOutcome {
            counts: written.counts,
            failed_pairs: run.failures().count(),
            write_error,
        })
    }
}
