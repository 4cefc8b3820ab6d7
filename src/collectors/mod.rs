// Collector module.
// Defines the trait, the shared pagination driver, and one implementation
// per upstream source.

pub mod aggregator;
pub mod directcrawl;
pub mod govfeed;
pub mod socialboard;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::error::AppError;
use crate::models::job::{JobRecord, Source, SourceQuery};
use crate::retry::RetryPolicy;

/// Trait that all job collectors implement.
/// A collector fetches one page of listings from its upstream source and
/// maps them to canonical [`JobRecord`]s; the pagination driver owns the
/// page loop, politeness delays and breaker bookkeeping.
#[async_trait]
pub trait JobCollector: Send + Sync {
    /// Which upstream this collector talks to.
    fn source(&self) -> Source;

    /// Fetch and map the page named by `query.page`.
    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError>;
}

/// Pagination tuning shared by all collectors.
#[derive(Debug, Clone)]
pub struct PaginationOpts {
    /// Hard ceiling on pages per run.
    pub max_pages: u32,
    /// Politeness interval between page requests.
    pub page_delay: Duration,
    /// Retry policy for transient page-fetch failures.
    pub retry: RetryPolicy,
}

impl Default for PaginationOpts {
    fn default() -> Self {
        Self {
            max_pages: 10,
            page_delay: Duration::from_millis(500),
            retry: RetryPolicy::fixed(Duration::from_secs(1), 2),
        }
    }
}

/// One collector plus the circuit breaker that is exclusively its own.
/// Nothing else reads or mutates this breaker.
pub struct CollectorHandle {
    collector: Arc<dyn JobCollector>,
    breaker: CircuitBreaker,
    opts: PaginationOpts,
}

impl CollectorHandle {
    pub fn new(
        collector: Arc<dyn JobCollector>,
        breaker_config: BreakerConfig,
        opts: PaginationOpts,
    ) -> Self {
        let breaker = CircuitBreaker::new(collector.source(), breaker_config);
        Self {
            collector,
            breaker,
            opts,
        }
    }

    pub fn source(&self) -> Source {
        self.collector.source()
    }

    /// Paginate through the source until it runs dry, a page fails, the
    /// breaker refuses, or the page ceiling is hit. Once at least one page
    /// succeeded the gathered records are always returned; an error is only
    /// surfaced when the source produced nothing at all.
    pub async fn fetch_all(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        let source = self.collector.source();
        let mut all = Vec::new();

        for page in 0..self.opts.max_pages {
            if !self.breaker.allow_request() {
                tracing::warn!(source = %source, page, "circuit open, stopping pagination");
                if all.is_empty() {
                    return Err(AppError::SourceUnavailable(source));
                }
                break;
            }

            let page_query = query.with_page(page);
            match self.fetch_page_with_retry(&page_query).await {
                Ok(records) => {
                    self.breaker.record_success();
                    if records.is_empty() {
                        tracing::debug!(source = %source, page, "empty page, pagination done");
                        break;
                    }
                    tracing::debug!(source = %source, page, count = records.len(), "page fetched");
                    all.extend(records);
                }
                Err(e) => {
                    self.breaker.record_failure();
                    if all.is_empty() {
                        // Nothing fetched at all: that is a source failure,
                        // not an empty result.
                        tracing::warn!(source = %source, page, error = %e, "first page failed");
                        return Err(e);
                    }
                    // Stop at the last good page, keep what we have.
                    tracing::warn!(source = %source, page, error = %e, "page fetch failed, stopping");
                    break;
                }
            }

            if page + 1 < self.opts.max_pages && !self.opts.page_delay.is_zero() {
                tokio::time::sleep(self.opts.page_delay).await;
            }
        }

        Ok(all)
    }

    async fn fetch_page_with_retry(
        &self,
        query: &SourceQuery,
    ) -> Result<Vec<JobRecord>, AppError> {
        let mut attempt = 0;
        loop {
            match self.collector.fetch_page(query).await {
                Ok(records) => return Ok(records),
                Err(e) if self.opts.retry.should_retry(attempt) => {
                    let delay = self.opts.retry.delay_for_attempt(attempt);
                    tracing::debug!(
                        source = %self.collector.source(),
                        page = query.page,
                        attempt,
                        error = %e,
                        "retrying page fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
