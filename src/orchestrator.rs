//! Pipeline orchestrator: concurrent fan-out over every collector, settle-all
//! fan-in, deduplication, and the persistence hand-off.
//!
//! One task per collector, joined without ordering assumptions; a collector
//! failing, timing out, or finding nothing never disturbs its siblings. The
//! call itself cannot fail once construction succeeded: total upstream
//! failure produces an empty job list with per-source errors, so an operator
//! can tell "no jobs today" from "everything broke".

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::collectors::CollectorHandle;
use crate::dedupe::dedupe;
use crate::error::AppError;
use crate::models::job::{JobRecord, Source, SourceQuery};
use crate::store::PersistenceGateway;

/// Outcome of one collector's slice of the run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: Source,
    pub job_count: usize,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ScrapeOutcome {
    pub jobs: Vec<JobRecord>,
    pub per_source: Vec<SourceReport>,
    pub summary: RunSummary,
}

pub struct Orchestrator {
    collectors: Vec<Arc<CollectorHandle>>,
    query: SourceQuery,
    /// Wall-clock budget per collector; a source still running past it is
    /// excluded from this run instead of blocking the aggregation.
    per_source_budget: Duration,
    store: Option<PersistenceGateway>,
}

impl Orchestrator {
    /// Fails only on construction-time misconfiguration: a pipeline with no
    /// collectors at all has nothing meaningful to run.
    pub fn new(
        collectors: Vec<Arc<CollectorHandle>>,
        query: SourceQuery,
        per_source_budget: Duration,
    ) -> Result<Self, AppError> {
        if collectors.is_empty() {
            return Err(AppError::MissingConfig(
                "no collectors are enabled; refusing to run an empty pipeline".to_string(),
            ));
        }
        Ok(Self {
            collectors,
            query,
            per_source_budget,
            store: None,
        })
    }

    /// Attach a persistence gateway; without one the run stops after dedupe.
    pub fn with_store(mut self, store: PersistenceGateway) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the whole pipeline once. Never fails; see the module docs.
    pub async fn scrape_all(&self) -> ScrapeOutcome {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(%run_id, sources = self.collectors.len(), "scrape run starting");

        let mut tasks = JoinSet::new();
        for handle in &self.collectors {
            let handle = Arc::clone(handle);
            let query = self.query.clone();
            let budget = self.per_source_budget;

            tasks.spawn(async move {
                let source = handle.source();
                let source_started = Instant::now();
                let outcome = tokio::time::timeout(budget, handle.fetch_all(&query)).await;
                let duration_ms = source_started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(Ok(jobs)) => {
                        tracing::info!(%source, count = jobs.len(), duration_ms, "source done");
                        let report = SourceReport {
                            source,
                            job_count: jobs.len(),
                            success: true,
                            error: None,
                            duration_ms,
                        };
                        (Some(jobs), report)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(%source, error = %e, duration_ms, "source failed");
                        let report = SourceReport {
                            source,
                            job_count: 0,
                            success: false,
                            error: Some(e.to_string()),
                            duration_ms,
                        };
                        (None, report)
                    }
                    Err(_) => {
                        tracing::warn!(%source, budget_secs = budget.as_secs(), "source timed out");
                        let report = SourceReport {
                            source,
                            job_count: 0,
                            success: false,
                            error: Some(format!("timed out after {}s", budget.as_secs())),
                            duration_ms,
                        };
                        (None, report)
                    }
                }
            });
        }

        let mut all_jobs: Vec<JobRecord> = Vec::new();
        let mut per_source: Vec<SourceReport> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((jobs, report)) => {
                    if let Some(jobs) = jobs {
                        all_jobs.extend(jobs);
                    }
                    per_source.push(report);
                }
                // A panicking collector task loses its report but must not
                // take the run down with it.
                Err(e) => tracing::error!(error = %e, "collector task aborted"),
            }
        }

        let total = all_jobs.len();
        let deduped = dedupe(all_jobs);
        let unique = deduped.records.len();
        let duplicates = deduped.duplicates;

        let (inserted, errors) = match &self.store {
            Some(store) => {
                let outcome = store.upsert_batch(&deduped.records).await;
                (outcome.inserted, outcome.errors)
            }
            None => (0, 0),
        };

        let summary = RunSummary {
            run_id,
            total,
            unique,
            duplicates,
            inserted,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            %run_id,
            total,
            unique,
            duplicates,
            inserted,
            errors,
            duration_ms = summary.duration_ms,
            "scrape run finished"
        );

        ScrapeOutcome {
            jobs: deduped.records,
            per_source,
            summary,
        }
    }
}
