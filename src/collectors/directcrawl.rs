//! Direct-crawl collector: no API, just the public search-results HTML.
//!
//! Each page fetch pulls one search-results page, harvests the posting links
//! out of it, and enriches every link through the extraction engine. The
//! engine's own fetcher handles politeness (jitter, user-agent rotation), so
//! this collector adds no extra sleeping beyond the shared page delay.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};
use url::Url;

use crate::collectors::JobCollector;
use crate::error::AppError;
use crate::extract::ExtractionEngine;
use crate::extract::fetch::PoliteFetcher;
use crate::models::job::{JobRecord, Source, SourceQuery, infer_experience_level, infer_work_type};

const LINK_SELECTORS: &[&str] = &[
    "a.job-link",
    "a[href*=\"/job/\"]",
    "a[href*=\"/jobs/\"]",
    "a[href*=\"/posting/\"]",
    "h2 a",
    "h3 a",
];

pub struct DirectCrawlCollector {
    fetcher: PoliteFetcher,
    engine: Arc<ExtractionEngine>,
    base_url: String,
    /// Upper bound on enrichment calls per page, so one link-heavy results
    /// page cannot monopolize the run budget.
    enrich_limit: usize,
}

impl DirectCrawlCollector {
    pub fn new(
        fetcher: PoliteFetcher,
        engine: Arc<ExtractionEngine>,
        base_url: impl Into<String>,
        enrich_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            engine,
            base_url: base_url.into(),
            enrich_limit: enrich_limit.max(1),
        }
    }
}

#[async_trait]
impl JobCollector for DirectCrawlCollector {
    fn source(&self) -> Source {
        Source::DirectCrawl
    }

    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        let search_url = Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[
                ("q", query.keywords.as_str()),
                ("l", query.location.as_str()),
                ("start", &(query.page * query.results_per_page).to_string()),
            ],
        )
        .map_err(|e| AppError::Internal(format!("invalid search URL: {e}")))?;

        let html = self.fetcher.fetch(search_url.as_str()).await?;
        let links = extract_posting_links(&html, &self.base_url);
        if links.is_empty() {
            return Ok(vec![]);
        }

        let mut records = Vec::new();
        for link in links.into_iter().take(self.enrich_limit) {
            let result = self.engine.extract(&link).await;
            let Some(data) = result.data.filter(|_| result.success) else {
                tracing::debug!(url = %link, error = ?result.error, "enrichment failed, dropping listing");
                continue;
            };

            let (Some(title), Some(company)) = (data.title.clone(), data.company.clone()) else {
                tracing::debug!(url = %link, "enriched page lacks title or company, dropping");
                continue;
            };

            let haystack = format!("{title} {}", data.description);

            records.push(JobRecord {
                work_type: infer_work_type(&haystack),
                experience_level: infer_experience_level(&haystack),
                title,
                company,
                location: data.location.unwrap_or_else(|| "Unspecified".to_string()),
                description: data.description,
                external_id: external_id_for(&link),
                url: link,
                source: Source::DirectCrawl,
                posted_at: None,
                salary_min: data.salary_min,
                salary_max: data.salary_max,
                scraped_at: Utc::now(),
                expires_at: None,
            });
        }

        Ok(records)
    }
}

/// Harvest absolute, deduplicated posting links from a search-results page.
/// Relative hrefs are resolved against the crawl base; anchors that resolve
/// off-site or back to a search page are dropped.
pub(crate) fn extract_posting_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return vec![];
    };
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for raw in LINK_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for anchor in doc.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if resolved.host_str() != base.host_str() {
                continue;
            }
            if resolved.path().contains("/search") {
                continue;
            }
            let link = resolved.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

/// Stable per-posting id derived from the link: the last meaningful path
/// segment, or the full URL when the path carries nothing usable.
fn external_id_for(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|s| !s.is_empty())
                .next_back()
                .map(String::from)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| link.to_string())
}
