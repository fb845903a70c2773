use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::{MatchRun, ReconcileReport, ReconcileTarget, ScoredResult};
use crate::store::{resolve_candidate, RowFailure, UpsertCounts};
use crate::state::AppState;

#[derive(Serialize)]
pub struct MatchListResponse {
    pub subject_id: Uuid,
    pub results: Vec<ScoredResult>,
    pub failed: usize,
    /// False when some or all scores were computed but could not be stored.
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<UpsertCounts>,
    /// Rows that could not be stored. Everything else in `counts` was written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsaved: Vec<RowFailure>,
}

#[derive(Deserialize)]
pub struct ReconcileRequest {
    pub target: ReconcileTarget,
    /// Every entity of `target` when absent.
    pub ids: Option<Vec<Uuid>>,
    pub chunk_size: Option<usize>,
}

/// Stores what could be scored. A write failure does not hide the scores.
async fn persist_and_respond(state: &AppState, subject_id: Uuid, run: MatchRun) -> MatchListResponse {
    let (persisted, counts, unsaved) = match state.upserts.upsert(&run.records()).await {
        Ok(report) => {
            if !report.is_complete() {
                warn!(
                    "Stored {} match scores for {subject_id}, {} could not be stored",
                    report.counts.total(),
                    report.failures.len()
                );
            }
            (report.is_complete(), Some(report.counts), report.failures)
        }
        Err(e) => {
            warn!("Could not store match scores for {subject_id}: {e}");
            (false, None, vec![])
        }
    };
    MatchListResponse {
        subject_id,
        failed: run.failures().count(),
        results: run.results,
        persisted,
        counts,
        unsaved,
    }
}

/// GET /api/v1/candidates/:user_ref/matches
pub async fn handle_candidate_matches(
    State(state): State<AppState>,
    Path(user_ref): Path<String>,
) -> Result<Json<MatchListResponse>, AppError> {
    let candidate = resolve_candidate(state.profiles.as_ref(), &user_ref).await?;
    let jobs = state.profiles.jobs().await?;
    let run = state.engine.match_candidate_to_jobs(&candidate, &jobs).await;
    info!(
        "Matched candidate {} against {} job postings",
        candidate.id,
        jobs.len()
    );
    Ok(Json(persist_and_respond(&state, candidate.id, run).await))
}

/// GET /api/v1/jobs/:id/matches
pub async fn handle_job_matches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchListResponse>, AppError> {
    let job = state
        .profiles
        .job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job posting {id} not found")))?;
    let candidates = state.profiles.candidates().await?;
    let run = state.engine.match_job_to_candidates(&job, &candidates).await;
    info!(
        "Matched job posting {} against {} candidates",
        job.id,
        candidates.len()
    );
    Ok(Json(persist_and_respond(&state, job.id, run).await))
}

/// POST /api/v1/matches/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileReport>, AppError> {
    let chunk_size = req
        .chunk_size
        .unwrap_or_else(|| state.coordinator.default_chunk_size());
    let report = match req.ids {
        Some(ids) => {
            state
                .coordinator
                .reconcile_all(req.target, &ids, chunk_size)
                .await?
        }
        None => {
            state
                .coordinator
                .reconcile_everything(req.target, chunk_size)
                .await?
        }
    };
    Ok(Json(report))
}
