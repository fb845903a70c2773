//! Fakes shared by unit tests: a scripted oracle and in-memory stores with
//! the same contracts as the Postgres implementations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analysis::ResumeAnalyzer;
use crate::cache::{AnalysisCache, InMemoryBackend, DEFAULT_ANALYSIS_TTL};
use crate::errors::AppError;
use crate::llm_client::{CallPolicy, CompletionOracle, LlmError};
use crate::matching::batch::DEFAULT_BATCH_CHUNK_SIZE;
use crate::matching::{BatchCoordinator, EngineSettings, MatchEngine, ScoringOracleClient};
use crate::models::candidate::{Candidate, ContentVersion};
use crate::models::job::JobPosting;
use crate::models::matching::{MatchRecord, MatchScoreRow, MatchStatus};
use crate::state::AppState;
use crate::store::matches::{MatchStore, UpsertOutcome, DEFAULT_UPSERT_CHUNK_SIZE};
use crate::store::profiles::ProfileStore;
use crate::store::UpsertStore;

// ────────────────────────────────────────────────────────────────────────────
// Oracle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum OracleScript {
    Reply(String),
    Delayed(Duration, String),
    /// Never answers; only a timeout ends the attempt.
    Hang,
    ServerError,
    BadRequest,
    /// Reply chosen by the first needle found in the prompt; 400 otherwise.
    Keyed(Vec<(String, String)>),
}

pub struct ScriptedOracle {
    queue: Mutex<VecDeque<OracleScript>>,
    steady: OracleScript,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Every call behaves the same way.
    pub fn new(script: OracleScript) -> Self {
        Self::sequence(vec![script])
    }

    /// Calls follow `scripts` in order; the last one repeats forever.
    pub fn sequence(scripts: Vec<OracleScript>) -> Self {
        let steady = scripts.last().cloned().unwrap_or(OracleScript::Hang);
        Self {
            queue: Mutex::new(scripts.into()),
            steady,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn keyed(pairs: &[(&str, &str)]) -> Self {
        Self::new(OracleScript::Keyed(
            pairs
                .iter()
                .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
                .collect(),
        ))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_script(&self) -> OracleScript {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| self.steady.clone())
        } else {
            self.steady.clone()
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.next_script() {
            OracleScript::Reply(text) => Ok(text),
            OracleScript::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            OracleScript::Hang => std::future::pending().await,
            OracleScript::ServerError => Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
            OracleScript::BadRequest => Err(LlmError::Api {
                status: 400,
                message: "bad request".to_string(),
            }),
            OracleScript::Keyed(pairs) => pairs
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
                .ok_or(LlmError::Api {
                    status: 400,
                    message: "no scripted reply".to_string(),
                }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn candidate(skills: &[&str]) -> Candidate {
    Candidate {
        id: Uuid::new_v4(),
        user_id: Some(Uuid::new_v4()),
        email: None,
        skills: strings(skills),
        experience: vec![],
        education: vec![],
        summary: String::new(),
        content_version: ContentVersion::new(fixed_time()),
    }
}

pub fn job(title: &str, required: &[&str]) -> JobPosting {
    JobPosting {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{title} role"),
        required_skills: strings(required),
        preferred_skills: vec![],
        updated_at: fixed_time(),
    }
}

fn unavailable() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

// ────────────────────────────────────────────────────────────────────────────
// Profiles
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProfiles {
    pub candidates: Vec<Candidate>,
    pub jobs: Vec<JobPosting>,
    pub user_emails: HashMap<Uuid, String>,
    /// Lookups of these candidate ids fail as if the database were down.
    pub broken_candidates: HashSet<Uuid>,
}

impl InMemoryProfiles {
    pub fn new(candidates: Vec<Candidate>, jobs: Vec<JobPosting>) -> Self {
        Self {
            candidates,
            jobs,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn candidate(&self, id: Uuid) -> Result<Option<Candidate>, AppError> {
        if self.broken_candidates.contains(&id) {
            return Err(unavailable());
        }
        Ok(self.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidate_by_user(&self, user_id: Uuid) -> Result<Option<Candidate>, AppError> {
        Ok(self
            .candidates
            .iter()
            .find(|c| c.user_id == Some(user_id))
            .cloned())
    }

    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError> {
        Ok(self
            .candidates
            .iter()
            .find(|c| {
                c.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        Ok(self.user_emails.get(&user_id).cloned())
    }

    async fn candidates(&self) -> Result<Vec<Candidate>, AppError> {
        Ok(self.candidates.clone())
    }

    async fn candidate_ids(&self) -> Result<Vec<Uuid>, AppError> {
        Ok(self.candidates.iter().map(|c| c.id).collect())
    }

    async fn job(&self, id: Uuid) -> Result<Option<JobPosting>, AppError> {
        Ok(self.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        Ok(self.jobs.clone())
    }

    async fn job_ids(&self) -> Result<Vec<Uuid>, AppError> {
        Ok(self.jobs.iter().map(|j| j.id).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Match rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryMatchStore {
    rows: Mutex<HashMap<(Uuid, Uuid), MatchScoreRow>>,
    statements: AtomicUsize,
    /// Writes touching these candidates fail as if the database were down.
    pub failing_candidates: HashSet<Uuid>,
}

impl InMemoryMatchStore {
    pub fn failing_for(candidate_ids: &[Uuid]) -> Self {
        Self {
            failing_candidates: candidate_ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn row(&self, candidate_id: Uuid, job_id: Uuid) -> Option<MatchScoreRow> {
        self.rows.lock().unwrap().get(&(candidate_id, job_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn upsert_rows(&self, records: &[MatchRecord]) -> Result<Vec<UpsertOutcome>, AppError> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        if records
            .iter()
            .any(|r| self.failing_candidates.contains(&r.candidate_id))
        {
            return Err(unavailable());
        }

        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        Ok(records
            .iter()
            .map(|record| match rows.get_mut(&record.key()) {
                Some(row) => {
                    row.score = i32::from(record.score);
                    if let Some(status) = record.status {
                        row.status = status.as_str().to_string();
                    }
                    row.updated_at = now;
                    UpsertOutcome::Updated
                }
                None => {
                    rows.insert(
                        record.key(),
                        MatchScoreRow {
                            id: Uuid::new_v4(),
                            candidate_id: record.candidate_id,
                            job_id: record.job_id,
                            score: i32::from(record.score),
                            status: record.status.unwrap_or_default().as_str().to_string(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    UpsertOutcome::Inserted
                }
            })
            .collect())
    }
}

pub fn status_of(store: &InMemoryMatchStore, candidate_id: Uuid, job_id: Uuid) -> Option<MatchStatus> {
    store
        .row(candidate_id, job_id)
        .and_then(|row| row.status.parse().ok())
}

// ────────────────────────────────────────────────────────────────────────────
// Application state
// ────────────────────────────────────────────────────────────────────────────

/// Full `AppState` over fakes, wired the way `main` wires the real thing.
pub fn app_state(
    profiles: InMemoryProfiles,
    oracle: Arc<ScriptedOracle>,
    store: Arc<InMemoryMatchStore>,
) -> AppState {
    let profiles: Arc<dyn ProfileStore> = Arc::new(profiles);
    let backend = Arc::new(InMemoryBackend::new());
    let match_cache = Arc::new(AnalysisCache::new(backend.clone(), "match", DEFAULT_ANALYSIS_TTL));
    let policy = CallPolicy::new(Duration::from_secs(15), 2);

    let engine = Arc::new(MatchEngine::new(
        ScoringOracleClient::new(oracle.clone(), policy.clone()),
        match_cache,
        EngineSettings::default(),
    ));
    let upserts = Arc::new(UpsertStore::new(store, DEFAULT_UPSERT_CHUNK_SIZE));
    let coordinator = Arc::new(BatchCoordinator::new(
        profiles.clone(),
        engine.clone(),
        upserts.clone(),
        DEFAULT_BATCH_CHUNK_SIZE,
    ));
    let analyzer = Arc::new(ResumeAnalyzer::new(
        profiles.clone(),
        oracle,
        policy,
        Arc::new(AnalysisCache::new(backend, "analysis", DEFAULT_ANALYSIS_TTL)),
    ));

    AppState {
        profiles,
        engine,
        coordinator,
        upserts,
        analyzer,
    }
}
