pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching
        .route(
            "/api/v1/candidates/:user_ref/matches",
            get(matching::handle_candidate_matches),
        )
        .route("/api/v1/jobs/:id/matches", get(matching::handle_job_matches))
        .route("/api/v1/matches/reconcile", post(matching::handle_reconcile))
        // Analysis
        .route(
            "/api/v1/candidates/:id/analysis",
            get(analysis::handle_analysis),
        )
        .route(
            "/api/v1/candidates/:id/invalidate",
            post(analysis::handle_invalidate),
        )
        .with_state(state)
}
