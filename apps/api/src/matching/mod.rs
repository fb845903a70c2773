pub mod batch;
pub mod engine;
pub mod handlers;
pub mod heuristic;
pub mod oracle;
pub mod prompts;

pub use batch::{BatchCoordinator, ReconcileReport, ReconcileTarget};
pub use engine::{EngineSettings, MatchEngine, MatchRun, ScoredResult};
pub use oracle::ScoringOracleClient;
