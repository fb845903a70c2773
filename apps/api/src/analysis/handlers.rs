use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::analysis::AnalysisReport;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/candidates/:id/analysis
pub async fn handle_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisReport>, AppError> {
    Ok(Json(state.analyzer.analyze(id).await?))
}

/// POST /api/v1/candidates/:id/invalidate
/// Called by the profile service after a résumé re-upload.
pub async fn handle_invalidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let jobs = state.profiles.jobs().await?;
    state.analyzer.invalidate(id).await;
    state.engine.invalidate(id, &jobs).await;
    info!("Invalidated cached analysis and {} match scores for {id}", jobs.len());
    Ok(StatusCode::NO_CONTENT)
}
