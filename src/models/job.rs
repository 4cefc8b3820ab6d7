use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream origin of a job record. Stored as its kebab-case text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    GovFeed,
    Aggregator,
    SocialBoard,
    DirectCrawl,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::GovFeed => "gov-feed",
            Source::Aggregator => "aggregator",
            Source::SocialBoard => "social-board",
            Source::DirectCrawl => "direct-crawl",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical job posting, as produced by every collector.
///
/// Identity: (`external_id`, `source`) names the origin record and is stable
/// across content edits. `url` is always an absolute link to one posting,
/// never a search-results page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: Source,
    pub external_id: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub work_type: Option<String>,
    pub experience_level: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page worth of search parameters. Stateless; collectors receive a fresh
/// instance per pagination step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuery {
    pub keywords: String,
    pub location: String,
    pub page: u32,
    pub results_per_page: u32,
}

impl SourceQuery {
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: location.into(),
            page: 0,
            results_per_page: 50,
        }
    }

    /// Same query aimed at a different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// Best-effort work-type inference from free text. Returns `None` rather
/// than guessing when no keyword matches.
pub fn infer_work_type(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("remote") || lower.contains("work from home") {
        Some("remote".to_string())
    } else if lower.contains("hybrid") {
        Some("hybrid".to_string())
    } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("in office") {
        Some("onsite".to_string())
    } else {
        None
    }
}

/// Best-effort experience-level inference from free text.
pub fn infer_experience_level(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("intern") {
        Some("internship".to_string())
    } else if lower.contains("junior") || lower.contains("entry level") || lower.contains("entry-level")
    {
        Some("entry".to_string())
    } else if lower.contains("principal") || lower.contains("staff") {
        Some("principal".to_string())
    } else if lower.contains("senior") || lower.contains("sr.") {
        Some("senior".to_string())
    } else if lower.contains("lead") {
        Some("lead".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_page_keeps_everything_else() {
        let q = SourceQuery::new("rust developer", "Berlin");
        let q2 = q.with_page(3);
        assert_eq!(q2.page, 3);
        assert_eq!(q2.keywords, "rust developer");
        assert_eq!(q2.location, "Berlin");
        assert_eq!(q2.results_per_page, q.results_per_page);
    }

    #[test]
    fn work_type_inference_is_best_effort() {
        assert_eq!(infer_work_type("Fully REMOTE role"), Some("remote".into()));
        assert_eq!(infer_work_type("Hybrid, 2 days in office"), Some("hybrid".into()));
        assert_eq!(infer_work_type("Forklift operator"), None);
    }

    #[test]
    fn experience_inference_prefers_more_specific_terms() {
        assert_eq!(infer_experience_level("Staff Engineer"), Some("principal".into()));
        assert_eq!(infer_experience_level("Senior Rust Developer"), Some("senior".into()));
        assert_eq!(infer_experience_level("Software Engineer"), None);
    }
}
