//! Persistence gateway: idempotent batched upserts into the jobs table.
//!
//! Records go in as fixed-size multi-row INSERTs with an ON CONFLICT clause,
//! so re-submitting previously seen records updates them in place instead of
//! duplicating. One batch failing after its retries is counted and skipped;
//! later batches still run.

use std::time::{Duration, Instant};

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::job::JobRecord;
use crate::retry::RetryPolicy;

/// Which column tuple identifies "the same record" on conflict.
///
/// `ExternalIdSource` is the canonical key: origin-stable, independent of
/// content edits. `ContentIdentity` exists for deployments whose upstreams
/// cannot be trusted to ship stable ids; it requires the alternate unique
/// index noted in the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKey {
    ExternalIdSource,
    ContentIdentity,
}

impl ConflictKey {
    fn columns(self) -> &'static str {
        match self {
            ConflictKey::ExternalIdSource => "(external_id, source)",
            ConflictKey::ContentIdentity => "(company, title, location, source)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub batch_size: usize,
    pub conflict_key: ConflictKey,
    /// Per-batch retry; the default is 3 fixed-delay attempts.
    pub retry: RetryPolicy,
    /// Breather between batches so one run cannot saturate the store.
    pub batch_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            conflict_key: ConflictKey::ExternalIdSource,
            retry: RetryPolicy::fixed(Duration::from_secs(1), 3),
            batch_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UpsertOutcome {
    /// Rows written (inserted or updated in place).
    pub inserted: usize,
    /// Records belonging to batches that failed even after retries.
    pub errors: usize,
    pub duration_ms: u64,
}

pub struct PersistenceGateway {
    pool: PgPool,
    config: StoreConfig,
}

impl PersistenceGateway {
    pub fn new(pool: PgPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    /// Write all records in `batch_size` chunks, serially.
    pub async fn upsert_batch(&self, records: &[JobRecord]) -> UpsertOutcome {
        let started = Instant::now();
        let mut inserted = 0;
        let mut errors = 0;

        for (index, chunk) in records.chunks(self.config.batch_size.max(1)).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            match self.upsert_chunk_with_retry(chunk).await {
                Ok(written) => inserted += written,
                Err(e) => {
                    tracing::error!(batch = index, size = chunk.len(), error = %e, "batch upsert failed after retries");
                    errors += chunk.len();
                }
            }
        }

        let outcome = UpsertOutcome {
            inserted,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            records = records.len(),
            inserted = outcome.inserted,
            errors = outcome.errors,
            duration_ms = outcome.duration_ms,
            "upsert finished"
        );
        outcome
    }

    async fn upsert_chunk_with_retry(&self, chunk: &[JobRecord]) -> Result<usize, AppError> {
        let mut attempt = 0;
        loop {
            match self.upsert_chunk(chunk).await {
                Ok(written) => return Ok(written),
                Err(e) if self.config.retry.should_retry(attempt) => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    tracing::warn!(attempt, error = %e, "batch upsert attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn upsert_chunk(&self, chunk: &[JobRecord]) -> Result<usize, AppError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO jobs (title, company, location, description, url, source, external_id, \
             posted_at, salary_min, salary_max, work_type, experience_level, scraped_at, expires_at) ",
        );

        builder.push_values(chunk, |mut row, job| {
            row.push_bind(&job.title)
                .push_bind(&job.company)
                .push_bind(&job.location)
                .push_bind(&job.description)
                .push_bind(&job.url)
                .push_bind(job.source.as_str())
                .push_bind(&job.external_id)
                .push_bind(job.posted_at)
                .push_bind(job.salary_min)
                .push_bind(job.salary_max)
                .push_bind(&job.work_type)
                .push_bind(&job.experience_level)
                .push_bind(job.scraped_at)
                .push_bind(job.expires_at);
        });

        builder.push(" ON CONFLICT ");
        builder.push(self.config.conflict_key.columns());
        builder.push(
            " DO UPDATE SET title = EXCLUDED.title, company = EXCLUDED.company, \
             location = EXCLUDED.location, description = EXCLUDED.description, \
             url = EXCLUDED.url, posted_at = EXCLUDED.posted_at, \
             salary_min = EXCLUDED.salary_min, salary_max = EXCLUDED.salary_max, \
             work_type = EXCLUDED.work_type, experience_level = EXCLUDED.experience_level, \
             scraped_at = EXCLUDED.scraped_at, expires_at = EXCLUDED.expires_at, \
             updated_at = NOW()",
        );

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }
}
