//! Read-only access to candidate profiles and job postings.
//!
//! Both are owned by external services; this crate never writes them.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateRow};
use crate::models::job::{JobPosting, JobPostingRow};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn candidate(&self, id: Uuid) -> Result<Option<Candidate>, AppError>;
    async fn candidate_by_user(&self, user_id: Uuid) -> Result<Option<Candidate>, AppError>;
    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError>;
    /// Email on the account, for profiles not linked by user id.
    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError>;
    /// Every candidate whose profile decodes; malformed rows are skipped.
    async fn candidates(&self) -> Result<Vec<Candidate>, AppError>;
    async fn candidate_ids(&self) -> Result<Vec<Uuid>, AppError>;
    async fn job(&self, id: Uuid) -> Result<Option<JobPosting>, AppError>;
    async fn jobs(&self) -> Result<Vec<JobPosting>, AppError>;
    async fn job_ids(&self) -> Result<Vec<Uuid>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Profile resolution
// ────────────────────────────────────────────────────────────────────────────

enum Lookup {
    CandidateId(Uuid),
    UserId(Uuid),
    AccountEmail(Uuid),
    Email(String),
}

impl Lookup {
    fn describe(&self) -> &'static str {
        match self {
            Lookup::CandidateId(_) => "candidate id",
            Lookup::UserId(_) => "user id",
            Lookup::AccountEmail(_) => "account email",
            Lookup::Email(_) => "email",
        }
    }

    async fn run(&self, store: &dyn ProfileStore) -> Result<Option<Candidate>, AppError> {
        match self {
            Lookup::CandidateId(id) => store.candidate(*id).await,
            Lookup::UserId(id) => store.candidate_by_user(*id).await,
            Lookup::AccountEmail(id) => match store.user_email(*id).await? {
                Some(email) => store.candidate_by_email(&email).await,
                None => Ok(None),
            },
            Lookup::Email(email) => store.candidate_by_email(email).await,
        }
    }
}

/// Resolves a raw user reference (candidate id, user id or email) to a profile.
///
/// Strategies run in order until one finds a profile. A strategy that errors
/// is logged and the next one still runs. If nothing is found, the last
/// strategy error is returned, or `NotFound` when every strategy ran cleanly.
pub async fn resolve_candidate(store: &dyn ProfileStore, user_ref: &str) -> Result<Candidate, AppError> {
    let user_ref = user_ref.trim();
    let lookups = match Uuid::parse_str(user_ref) {
        Ok(id) => vec![Lookup::CandidateId(id), Lookup::UserId(id), Lookup::AccountEmail(id)],
        Err(_) if user_ref.contains('@') => vec![Lookup::Email(user_ref.to_string())],
        Err(_) => {
            return Err(AppError::Validation(format!(
                "'{user_ref}' is neither an id nor an email address"
            )))
        }
    };

    let mut last_error = None;
    for lookup in lookups {
        match lookup.run(store).await {
            Ok(Some(candidate)) => {
                debug!("Resolved '{user_ref}' by {} to candidate {}", lookup.describe(), candidate.id);
                return Ok(candidate);
            }
            Ok(None) => debug!("No candidate for '{user_ref}' by {}", lookup.describe()),
            Err(e) => {
                warn!("Candidate lookup by {} failed for '{user_ref}': {e}", lookup.describe());
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::NotFound(format!("No candidate profile for '{user_ref}'"))))
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

const CANDIDATE_COLUMNS: &str =
    "SELECT id, user_id, email, skills, experience, education, summary, updated_at FROM candidates";
const JOB_COLUMNS: &str =
    "SELECT id, title, description, required_skills, preferred_skills, updated_at FROM job_postings";

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn one_candidate(&self, filter: &str, bind: impl ToString) -> Result<Option<Candidate>, AppError> {
        let sql = format!("{CANDIDATE_COLUMNS} WHERE {filter} ORDER BY updated_at DESC LIMIT 1");
        let row: Option<CandidateRow> = sqlx::query_as(&sql)
            .bind(bind.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Candidate::try_from).transpose()
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn candidate(&self, id: Uuid) -> Result<Option<Candidate>, AppError> {
        self.one_candidate("id = $1::uuid", id).await
    }

    async fn candidate_by_user(&self, user_id: Uuid) -> Result<Option<Candidate>, AppError> {
        self.one_candidate("user_id = $1::uuid", user_id).await
    }

    async fn candidate_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError> {
        self.one_candidate("LOWER(email) = LOWER($1)", email).await
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let email: Option<Option<String>> =
            sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(email.flatten())
    }

    async fn candidates(&self) -> Result<Vec<Candidate>, AppError> {
        let rows: Vec<CandidateRow> = sqlx::query_as(&format!("{CANDIDATE_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match Candidate::try_from(row) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!("Skipping candidate profile: {e}");
                    None
                }
            })
            .collect())
    }

    async fn candidate_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar("SELECT id FROM candidates ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn job(&self, id: Uuid) -> Result<Option<JobPosting>, AppError> {
        let row: Option<JobPostingRow> = sqlx::query_as(&format!("{JOB_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JobPosting::from))
    }

    async fn jobs(&self) -> Result<Vec<JobPosting>, AppError> {
        let rows: Vec<JobPostingRow> = sqlx::query_as(&format!("{JOB_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(JobPosting::from).collect())
    }

    async fn job_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar("SELECT id FROM job_postings ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
