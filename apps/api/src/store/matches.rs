//! Idempotent persistence of match scores keyed by (candidate_id, job_id).
//!
//! Expected relation:
//! ```sql
//! CREATE TABLE match_scores (
//!     id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     candidate_id UUID NOT NULL,
//!     job_id       UUID NOT NULL,
//!     score        INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
//!     status       TEXT NOT NULL DEFAULT 'pending',
//!     created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (candidate_id, job_id)
//! );
//! ```
//!
//! Concurrent writers to the same key are serialized by `ON CONFLICT`;
//! there is no application-level locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::matching::{MatchRecord, MatchScoreRow};

pub const DEFAULT_UPSERT_CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub created: usize,
    pub updated: usize,
}

impl UpsertCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, outcomes: &[UpsertOutcome]) {
        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Inserted => self.created += 1,
                UpsertOutcome::Updated => self.updated += 1,
            }
        }
    }
}

/// A row that could not be written, with the store error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub reason: String,
}

/// Result of one `UpsertStore::upsert` call. Counts cover only rows that
/// were written; every other row is listed in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    #[serde(flatten)]
    pub counts: UpsertCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RowFailure>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Row-level upsert primitive.
///
/// Contract for `upsert_rows`:
/// - `records` carry unique keys and are written atomically
/// - the returned outcomes are in `records` order
/// - a record with `status: None` updates only the score of an existing row
///   and inserts new rows as pending
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn upsert_rows(&self, records: &[MatchRecord]) -> Result<Vec<UpsertOutcome>, AppError>;
}

/// Batches, de-duplicates and validates writes before they reach a `MatchStore`.
pub struct UpsertStore {
    store: Arc<dyn MatchStore>,
    chunk_size: usize,
}

impl UpsertStore {
    pub fn new(store: Arc<dyn MatchStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Writes `records` in chunks of `chunk_size`.
    ///
    /// Any malformed record fails the whole call before anything is written.
    /// A failing chunk is reported in `UpsertReport::failures` and the
    /// remaining chunks are still written.
    pub async fn upsert(&self, records: &[MatchRecord]) -> Result<UpsertReport, AppError> {
        for record in records {
            record.validate()?;
        }

        let unique = dedup_last_wins(records);
        if unique.len() < records.len() {
            debug!(
                "Collapsed {} duplicate match keys before upsert",
                records.len() - unique.len()
            );
        }

        let mut report = UpsertReport::default();
        for chunk in unique.chunks(self.chunk_size) {
            match self.store.upsert_rows(chunk).await {
                Ok(outcomes) => report.counts.record(&outcomes),
                Err(e @ AppError::InvalidKey(_)) => return Err(e),
                Err(e) => {
                    warn!("Could not write {} match rows: {e}", chunk.len());
                    let reason = e.to_string();
                    report.failures.extend(chunk.iter().map(|record| RowFailure {
                        candidate_id: record.candidate_id,
                        job_id: record.job_id,
                        reason: reason.clone(),
                    }));
                }
            }
        }
        debug!(
            "Upserted {} match rows ({} new, {} failed)",
            report.counts.total(),
            report.counts.created,
            report.failures.len()
        );
        Ok(report)
    }
}

/// One record per key, in first-seen order, holding the last value seen.
fn dedup_last_wins(records: &[MatchRecord]) -> Vec<MatchRecord> {
    let mut position: HashMap<(Uuid, Uuid), usize> = HashMap::new();
    let mut unique: Vec<MatchRecord> = Vec::with_capacity(records.len());
    for record in records {
        match position.get(&record.key()) {
            Some(&idx) => unique[idx] = record.clone(),
            None => {
                position.insert(record.key(), unique.len());
                unique.push(record.clone());
            }
        }
    }
    unique
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    score_row: MatchScoreRow,
    inserted: bool,
}

pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `xmax = 0` holds only for a row version created by this INSERT, never
/// for one rewritten by `DO UPDATE`.
const RETURNING_INSERTED: &str = " RETURNING id, candidate_id, job_id, score, status, \
     created_at, updated_at, (xmax = 0) AS inserted";

fn score_only_upsert(records: &[&MatchRecord]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("INSERT INTO match_scores (candidate_id, job_id, score) ");
    builder.push_values(records, |mut b, record| {
        b.push_bind(record.candidate_id)
            .push_bind(record.job_id)
            .push_bind(i32::from(record.score));
    });
    builder.push(
        " ON CONFLICT (candidate_id, job_id) DO UPDATE SET \
         score = EXCLUDED.score, updated_at = NOW()",
    );
    builder.push(RETURNING_INSERTED);
    builder
}

fn score_and_status_upsert(records: &[&MatchRecord]) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::new("INSERT INTO match_scores (candidate_id, job_id, score, status) ");
    builder.push_values(records, |mut b, record| {
        b.push_bind(record.candidate_id)
            .push_bind(record.job_id)
            .push_bind(i32::from(record.score))
            .push_bind(record.status.unwrap_or_default().as_str());
    });
    builder.push(
        " ON CONFLICT (candidate_id, job_id) DO UPDATE SET \
         score = EXCLUDED.score, status = EXCLUDED.status, updated_at = NOW()",
    );
    builder.push(RETURNING_INSERTED);
    builder
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn upsert_rows(&self, records: &[MatchRecord]) -> Result<Vec<UpsertOutcome>, AppError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let (with_status, score_only): (Vec<&MatchRecord>, Vec<&MatchRecord>) =
            records.iter().partition(|r| r.status.is_some());

        let mut tx = self.pool.begin().await?;
        let mut returned: Vec<UpsertedRow> = Vec::with_capacity(records.len());
        if !score_only.is_empty() {
            let mut query = score_only_upsert(&score_only);
            returned.extend(
                query
                    .build_query_as::<UpsertedRow>()
                    .fetch_all(&mut *tx)
                    .await?,
            );
        }
        if !with_status.is_empty() {
            let mut query = score_and_status_upsert(&with_status);
            returned.extend(
                query
                    .build_query_as::<UpsertedRow>()
                    .fetch_all(&mut *tx)
                    .await?,
            );
        }
        tx.commit().await?;

        let by_key: HashMap<(Uuid, Uuid), bool> = returned
            .into_iter()
            .map(|upserted| ((upserted.score_row.candidate_id, upserted.score_row.job_id), upserted.inserted))
            .collect();

        let outcomes = records
            .iter()
            .map(|record| match by_key.get(&record.key()) {
                Some(true) => Ok(UpsertOutcome::Inserted),
                Some(false) => Ok(UpsertOutcome::Updated),
                None => Err(AppError::Internal(anyhow::anyhow!(
                    "upsert returned no row for ({}, {})",
                    record.candidate_id,
                    record.job_id
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Upserted {} match rows", outcomes.len());
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::MatchStatus;
    use crate::test_support::{status_of, InMemoryMatchStore};

    fn upserts(store: &Arc<InMemoryMatchStore>, chunk_size: usize) -> UpsertStore {
        UpsertStore::new(store.clone(), chunk_size)
    }

    #[tokio::test]
    async fn test_repeated_upsert_keeps_one_row() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, DEFAULT_UPSERT_CHUNK_SIZE);
        let record = MatchRecord::scored(Uuid::new_v4(), Uuid::new_v4(), 64);

        let first = upserts.upsert(std::slice::from_ref(&record)).await.unwrap();
        let second = upserts.upsert(std::slice::from_ref(&record)).await.unwrap();

        assert_eq!(first.counts, UpsertCounts { created: 1, updated: 0 });
        assert_eq!(second.counts, UpsertCounts { created: 0, updated: 1 });
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rescoring_preserves_candidate_decision() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, DEFAULT_UPSERT_CHUNK_SIZE);
        let (cid, jid) = (Uuid::new_v4(), Uuid::new_v4());

        let applied = MatchRecord {
            status: Some(MatchStatus::Applied),
            ..MatchRecord::scored(cid, jid, 70)
        };
        upserts.upsert(&[applied]).await.unwrap();
        upserts.upsert(&[MatchRecord::scored(cid, jid, 82)]).await.unwrap();

        let row = store.row(cid, jid).unwrap();
        assert_eq!(row.score, 82);
        assert_eq!(status_of(&store, cid, jid), Some(MatchStatus::Applied));
    }

    #[tokio::test]
    async fn test_explicit_status_overwrites() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, DEFAULT_UPSERT_CHUNK_SIZE);
        let (cid, jid) = (Uuid::new_v4(), Uuid::new_v4());

        upserts.upsert(&[MatchRecord::scored(cid, jid, 70)]).await.unwrap();
        assert_eq!(status_of(&store, cid, jid), Some(MatchStatus::Pending));

        let declined = MatchRecord {
            status: Some(MatchStatus::Declined),
            ..MatchRecord::scored(cid, jid, 70)
        };
        upserts.upsert(&[declined]).await.unwrap();
        assert_eq!(status_of(&store, cid, jid), Some(MatchStatus::Declined));
    }

    #[tokio::test]
    async fn test_duplicate_keys_collapse_last_wins() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, DEFAULT_UPSERT_CHUNK_SIZE);
        let (cid, jid) = (Uuid::new_v4(), Uuid::new_v4());

        let report = upserts
            .upsert(&[
                MatchRecord::scored(cid, jid, 40),
                MatchRecord::scored(cid, Uuid::new_v4(), 50),
                MatchRecord::scored(cid, jid, 90),
            ])
            .await
            .unwrap();

        assert_eq!(report.counts, UpsertCounts { created: 2, updated: 0 });
        assert_eq!(store.row(cid, jid).unwrap().score, 90);
    }

    #[tokio::test]
    async fn test_writes_are_chunked() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, 10);
        let cid = Uuid::new_v4();
        let records: Vec<MatchRecord> = (0..25)
            .map(|i| MatchRecord::scored(cid, Uuid::new_v4(), i))
            .collect();

        let report = upserts.upsert(&records).await.unwrap();

        assert_eq!(report.counts.total(), 25);
        assert_eq!(store.statements(), 3);
    }

    #[tokio::test]
    async fn test_malformed_record_fails_before_any_write() {
        let store = Arc::new(InMemoryMatchStore::default());
        let upserts = upserts(&store, 1);

        let err = upserts
            .upsert(&[
                MatchRecord::scored(Uuid::new_v4(), Uuid::new_v4(), 50),
                MatchRecord::scored(Uuid::nil(), Uuid::new_v4(), 50),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidKey(_)));
        assert_eq!(store.statements(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_per_row() {
        let broken = Uuid::new_v4();
        let store = Arc::new(InMemoryMatchStore::failing_for(&[broken]));
        let upserts = upserts(&store, DEFAULT_UPSERT_CHUNK_SIZE);
        let job_id = Uuid::new_v4();

        let report = upserts
            .upsert(&[MatchRecord::scored(broken, job_id, 50)])
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.counts, UpsertCounts::default());
        assert_eq!(report.failures.len(), 1);
        assert_eq!((report.failures[0].candidate_id, report.failures[0].job_id), (broken, job_id));
        assert!(report.failures[0].reason.starts_with("Database error"));
    }

    #[tokio::test]
    async fn test_failing_chunk_does_not_stop_later_chunks() {
        let cids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let store = Arc::new(InMemoryMatchStore::failing_for(&[cids[1]]));
        let upserts = upserts(&store, 10);
        let records: Vec<MatchRecord> = cids
            .iter()
            .flat_map(|cid| (0..10).map(move |i| MatchRecord::scored(*cid, Uuid::new_v4(), i)))
            .collect();

        let report = upserts.upsert(&records).await.unwrap();

        assert_eq!(store.statements(), 3);
        assert_eq!(store.len(), 20);
        assert_eq!(report.counts, UpsertCounts { created: 20, updated: 0 });
        assert_eq!(report.failures.len(), 10);
        assert!(report.failures.iter().all(|f| f.candidate_id == cids[1]));
        assert!(records[20..].iter().all(|r| store.row(r.candidate_id, r.job_id).is_some()));
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let store = Arc::new(InMemoryMatchStore::default());
        let report = upserts(&store, 10).upsert(&[]).await.unwrap();
        assert_eq!(report, UpsertReport::default());
        assert_eq!(store.statements(), 0);
    }
}
