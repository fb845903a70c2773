use axum::Json;
use serde_json::{json, Value};

use crate::llm_client::MODEL;

/// GET /health
/// Liveness only: the database and oracle are not probed.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "matcher",
        "version": env!("CARGO_PKG_VERSION"),
        "oracle_model": MODEL,
    }))
}
