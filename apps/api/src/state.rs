use std::sync::Arc;

use crate::analysis::ResumeAnalyzer;
use crate::matching::{BatchCoordinator, MatchEngine};
use crate::store::{ProfileStore, UpsertStore};

/// Shared application state injected into all route handlers via Axum extractors.
/// Every component is built once in `main` and shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    /// Interactive engine: match-timeout policy.
    pub engine: Arc<MatchEngine>,
    /// Drives its own engine with the shorter batch-timeout policy.
    pub coordinator: Arc<BatchCoordinator>,
    pub upserts: Arc<UpsertStore>,
    pub analyzer: Arc<ResumeAnalyzer>,
}
