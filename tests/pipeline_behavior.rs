//! Behavior tests for the aggregation pipeline.
//!
//! Fake collectors stand in for the upstream sources so the orchestrator's
//! settle-all, timeout, dedup and breaker behavior can be exercised without
//! any network or database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use jobscout::breaker::BreakerConfig;
use jobscout::collectors::{CollectorHandle, JobCollector, PaginationOpts};
use jobscout::error::AppError;
use jobscout::models::job::{JobRecord, Source, SourceQuery};
use jobscout::orchestrator::Orchestrator;
use jobscout::retry::RetryPolicy;

fn job(source: Source, id: &str, title: &str, description_len: usize) -> JobRecord {
    JobRecord {
        title: title.to_string(),
        company: "Acme Corp".to_string(),
        location: "Berlin".to_string(),
        description: "d".repeat(description_len),
        url: format!("https://example.com/jobs/{id}"),
        source,
        external_id: id.to_string(),
        posted_at: None,
        salary_min: None,
        salary_max: None,
        work_type: None,
        experience_level: None,
        scraped_at: Utc::now(),
        expires_at: None,
    }
}

/// Scripted source: serves `pages` in order, then runs dry. Can be told to
/// fail every call or to stall for a fixed delay first.
struct FakeCollector {
    source: Source,
    pages: Vec<Vec<JobRecord>>,
    fail: bool,
    delay: Duration,
}

impl FakeCollector {
    fn serving(source: Source, pages: Vec<Vec<JobRecord>>) -> Self {
        Self {
            source,
            pages,
            fail: false,
            delay: Duration::ZERO,
        }
    }

    fn failing(source: Source) -> Self {
        Self {
            source,
            pages: vec![],
            fail: true,
            delay: Duration::ZERO,
        }
    }

    fn stalling(source: Source, delay: Duration) -> Self {
        Self {
            source,
            pages: vec![],
            fail: false,
            delay,
        }
    }
}

#[async_trait]
impl JobCollector for FakeCollector {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(AppError::Http("upstream returned HTTP 500".to_string()));
        }
        Ok(self
            .pages
            .get(query.page as usize)
            .cloned()
            .unwrap_or_default())
    }
}

fn fast_opts() -> PaginationOpts {
    PaginationOpts {
        max_pages: 5,
        page_delay: Duration::ZERO,
        retry: RetryPolicy::fixed(Duration::from_millis(1), 1),
    }
}

fn handle(collector: FakeCollector) -> Arc<CollectorHandle> {
    Arc::new(CollectorHandle::new(
        Arc::new(collector),
        BreakerConfig::default(),
        fast_opts(),
    ))
}

fn orchestrator(handles: Vec<Arc<CollectorHandle>>) -> Orchestrator {
    Orchestrator::new(
        handles,
        SourceQuery::new("engineer", "berlin"),
        Duration::from_secs(5),
    )
    .expect("at least one collector")
}

// =============================================================================
// Settle-all resilience
// =============================================================================

#[tokio::test]
async fn failing_sources_do_not_disturb_the_successful_ones() {
    // Given: five sources, two of which fail on every request
    let handles = vec![
        handle(FakeCollector::serving(
            Source::GovFeed,
            vec![vec![job(Source::GovFeed, "g1", "Archivist", 120)]],
        )),
        handle(FakeCollector::serving(
            Source::Aggregator,
            vec![vec![
                job(Source::Aggregator, "a1", "Platform Engineer", 300),
                job(Source::Aggregator, "a2", "Data Engineer", 150),
            ]],
        )),
        handle(FakeCollector::serving(
            Source::SocialBoard,
            vec![vec![job(Source::SocialBoard, "s1", "Platform Engineer", 80)]],
        )),
        handle(FakeCollector::failing(Source::DirectCrawl)),
        handle(FakeCollector::failing(Source::GovFeed)),
    ];

    // When: the whole pipeline runs
    let outcome = orchestrator(handles).scrape_all().await;

    // Then: the three healthy sources' jobs come back, deduplicated
    assert_eq!(outcome.summary.total, 4);
    assert_eq!(outcome.summary.unique, 3);
    assert_eq!(outcome.summary.duplicates, 1);

    // the duplicate "Platform Engineer" kept the longer description
    let platform = outcome
        .jobs
        .iter()
        .find(|j| j.title == "Platform Engineer")
        .expect("platform engineer survives dedupe");
    assert_eq!(platform.description.len(), 300);
    assert_eq!(platform.source, Source::Aggregator);

    // and the failures are visible per source, not thrown
    assert_eq!(outcome.per_source.len(), 5);
    let failed: Vec<_> = outcome.per_source.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 2);
    for report in failed {
        assert!(report.error.as_deref().unwrap_or("").contains("HTTP 500"));
        assert_eq!(report.job_count, 0);
    }
}

#[tokio::test]
async fn total_failure_yields_empty_jobs_and_per_source_errors() {
    // Given: every source is broken
    let handles = vec![
        handle(FakeCollector::failing(Source::GovFeed)),
        handle(FakeCollector::failing(Source::Aggregator)),
        handle(FakeCollector::failing(Source::SocialBoard)),
    ];

    // When
    let outcome = orchestrator(handles).scrape_all().await;

    // Then: an empty run, distinguishable from "no jobs today"
    assert!(outcome.jobs.is_empty());
    assert_eq!(outcome.summary.unique, 0);
    assert_eq!(outcome.per_source.len(), 3);
    assert!(outcome.per_source.iter().all(|r| !r.success));
    assert!(outcome.per_source.iter().all(|r| r.error.is_some()));
}

#[tokio::test]
async fn slow_source_is_excluded_without_blocking_the_run() {
    // Given: one source that stalls far past the per-source budget
    let handles = vec![
        handle(FakeCollector::serving(
            Source::Aggregator,
            vec![vec![job(Source::Aggregator, "a1", "Quick Result", 150)]],
        )),
        handle(FakeCollector::stalling(
            Source::DirectCrawl,
            Duration::from_secs(30),
        )),
    ];
    let orchestrator = Orchestrator::new(
        handles,
        SourceQuery::new("engineer", "berlin"),
        Duration::from_millis(100),
    )
    .expect("collectors present");

    // When
    let started = std::time::Instant::now();
    let outcome = orchestrator.scrape_all().await;

    // Then: the run finishes promptly with partial results
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.jobs.len(), 1);

    let timed_out = outcome
        .per_source
        .iter()
        .find(|r| r.source == Source::DirectCrawl)
        .expect("report for the slow source");
    assert!(!timed_out.success);
    assert!(timed_out.error.as_deref().unwrap_or("").contains("timed out"));
}

// =============================================================================
// Breaker integration across runs
// =============================================================================

#[tokio::test]
async fn open_breaker_surfaces_as_source_unavailable_on_the_next_run() {
    // Given: a failing source whose breaker opens on the first failure
    let failing = Arc::new(CollectorHandle::new(
        Arc::new(FakeCollector::failing(Source::SocialBoard)),
        BreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(600),
        },
        fast_opts(),
    ));
    let orchestrator = Orchestrator::new(
        vec![failing],
        SourceQuery::new("engineer", "berlin"),
        Duration::from_secs(5),
    )
    .expect("collectors present");

    // When: two consecutive runs
    let first = orchestrator.scrape_all().await;
    let second = orchestrator.scrape_all().await;

    // Then: the first run saw the upstream error, the second was refused by
    // the still-open circuit without touching the upstream
    assert!(first.per_source[0].error.as_deref().unwrap_or("").contains("HTTP 500"));
    assert!(
        second.per_source[0]
            .error
            .as_deref()
            .unwrap_or("")
            .contains("temporarily unavailable")
    );
}

// =============================================================================
// Construction
// =============================================================================

#[tokio::test]
async fn empty_collector_set_is_a_construction_error() {
    let result = Orchestrator::new(
        vec![],
        SourceQuery::new("engineer", "berlin"),
        Duration::from_secs(5),
    );
    assert!(matches!(result, Err(AppError::MissingConfig(_))));
}
