//! Content extraction engine: recover structured fields from an arbitrary
//! job-posting URL through an ordered fallback chain.
//!
//! Strategies, cheapest first:
//! 1. structured: schema.org `JobPosting` JSON-LD embedded in the page
//! 2. dom: ranked CSS selectors over the static HTML
//! 3. rendered: same selectors against a headless-browser DOM
//! 4. regex: raw-HTML pattern salvage
//!
//! A strategy wins when its description reaches [`MIN_DESCRIPTION_LEN`];
//! anything shorter escalates to the next strategy. Every strategy isolates
//! its own failures, so a timeout or parse error falls through instead of
//! aborting the call.

pub mod dom;
pub mod fetch;
pub mod regex_fallback;
pub mod rendered;
pub mod structured;

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::AppError;
use crate::extract::fetch::PoliteFetcher;
use crate::extract::rendered::BrowserHandle;

/// Minimum description length for a strategy to be accepted.
pub const MIN_DESCRIPTION_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Structured,
    DomParse,
    Rendered,
    Regex,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Structured => write!(f, "structured"),
            ExtractionMethod::DomParse => write!(f, "dom-parse"),
            ExtractionMethod::Rendered => write!(f, "rendered"),
            ExtractionMethod::Regex => write!(f, "regex"),
        }
    }
}

/// Fields recovered from one posting page.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
}

/// Outcome of one extraction call. Never an error: total failure is
/// `success: false` with the last error string attached.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub method: Option<ExtractionMethod>,
    pub data: Option<ExtractedJob>,
    pub error: Option<String>,
}

impl ScrapeResult {
    fn hit(method: ExtractionMethod, data: ExtractedJob) -> Self {
        Self {
            success: true,
            method: Some(method),
            data: Some(data),
            error: None,
        }
    }

    fn miss(error: String) -> Self {
        Self {
            success: false,
            method: None,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Per-request timeout for static fetches.
    pub request_timeout: Duration,
    /// Navigation timeout for the rendered strategy.
    pub browser_timeout: Duration,
    /// Whether the rendered strategy may launch a browser at all.
    pub use_browser: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            browser_timeout: Duration::from_secs(30),
            use_browser: true,
        }
    }
}

pub struct ExtractionEngine {
    fetcher: PoliteFetcher,
    config: ExtractorConfig,
    // Lazily launched on the first rendered attempt; a failed launch is
    // remembered as None so later calls skip the strategy instead of
    // retrying the launch on every URL.
    browser: OnceCell<Option<BrowserHandle>>,
}

impl ExtractionEngine {
    pub fn new(config: ExtractorConfig) -> Result<Self, AppError> {
        let fetcher = PoliteFetcher::new(config.request_timeout)?;
        Ok(Self {
            fetcher,
            config,
            browser: OnceCell::new(),
        })
    }

    /// Run the fallback chain against one URL.
    pub async fn extract(&self, url: &str) -> ScrapeResult {
        let mut last_error: Option<String> = None;

        let static_html = match self.fetcher.fetch(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::debug!(url, error = %e, "static fetch failed");
                last_error = Some(e.to_string());
                None
            }
        };

        if let Some(html) = static_html.as_deref()
            && let Some((method, job)) = extract_static(html)
        {
            tracing::debug!(url, method = %method, "extraction hit");
            return ScrapeResult::hit(method, job);
        }

        let mut rendered_html: Option<String> = None;
        if self.config.use_browser
            && let Some(browser) = self.browser().await
        {
            match browser.fetch_rendered(url).await {
                Ok(html) => {
                    if let Some(job) = dom::parse(&html).filter(meets_threshold) {
                        tracing::debug!(url, method = %ExtractionMethod::Rendered, "extraction hit");
                        return ScrapeResult::hit(ExtractionMethod::Rendered, job);
                    }
                    rendered_html = Some(html);
                }
                Err(e) => {
                    tracing::debug!(url, error = %e, "rendered fetch failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        // Regex salvage prefers the rendered DOM when we have it.
        if let Some(html) = rendered_html.as_deref().or(static_html.as_deref())
            && let Some(job) = regex_fallback::parse(html).filter(meets_threshold)
        {
            tracing::debug!(url, method = %ExtractionMethod::Regex, "extraction hit");
            return ScrapeResult::hit(ExtractionMethod::Regex, job);
        }

        tracing::debug!(url, "all extraction strategies exhausted");
        ScrapeResult::miss(
            last_error.unwrap_or_else(|| "no strategy reached the content threshold".to_string()),
        )
    }

    async fn browser(&self) -> Option<&BrowserHandle> {
        self.browser
            .get_or_init(|| async {
                match BrowserHandle::launch(self.config.browser_timeout).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        tracing::warn!(error = %e, "headless browser unavailable, rendered strategy disabled");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

fn meets_threshold(job: &ExtractedJob) -> bool {
    job.description.len() >= MIN_DESCRIPTION_LEN
}

/// Static strategies (structured, then dom) over already-fetched HTML.
fn extract_static(html: &str) -> Option<(ExtractionMethod, ExtractedJob)> {
    if let Some(job) = structured::parse(html).filter(meets_threshold) {
        return Some((ExtractionMethod::Structured, job));
    }
    if let Some(job) = dom::parse(html).filter(meets_threshold) {
        return Some((ExtractionMethod::DomParse, job));
    }
    None
}

static SALARY_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[$€£]\s*(\d{1,3}(?:,\d{3})+|\d{4,7})(?:\s*(?:[-–]|to)\s*[$€£]?\s*(\d{1,3}(?:,\d{3})+|\d{4,7}))?",
    )
    .expect("hardcoded regex compiles")
});

/// Best-effort "$120,000 - $150,000" style range scan over free text.
pub fn parse_salary_range(text: &str) -> (Option<i64>, Option<i64>) {
    let Some(captures) = SALARY_RANGE_RE.captures(text) else {
        return (None, None);
    };
    let parse = |m: regex::Match<'_>| m.as_str().replace(',', "").parse::<i64>().ok();
    let min = captures.get(1).and_then(parse);
    let max = captures.get(2).and_then(parse);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_range_with_commas() {
        assert_eq!(
            parse_salary_range("Pay: $120,000 - $150,000 per year"),
            (Some(120_000), Some(150_000))
        );
    }

    #[test]
    fn salary_single_value() {
        assert_eq!(parse_salary_range("From €55000 yearly"), (Some(55_000), None));
    }

    #[test]
    fn salary_absent() {
        assert_eq!(parse_salary_range("Competitive compensation"), (None, None));
    }

    #[test]
    fn short_structured_block_escalates_to_dom() {
        // JSON-LD description is below MIN_DESCRIPTION_LEN, the DOM block is
        // above it; the chain must not accept the structured result.
        let short = "Operate the warehouse, forty chars.";
        assert!(short.len() < MIN_DESCRIPTION_LEN);
        let long = "Full posting body with responsibilities, requirements, benefits and \
                    enough detail to clear the minimum content threshold easily.";
        assert!(long.len() >= MIN_DESCRIPTION_LEN);

        let html = format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type": "JobPosting", "title": "Picker", "description": "{short}"}}
            </script></head>
            <body><h1>Picker</h1><div class="job-description">{long}</div></body></html>"#
        );

        let (method, job) = extract_static(&html).expect("dom strategy should win");
        assert_eq!(method, ExtractionMethod::DomParse);
        assert!(job.description.contains("responsibilities"));
    }

    #[test]
    fn structured_block_wins_when_long_enough() {
        let long = "a".repeat(150);
        let html = format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type": "JobPosting", "title": "Picker", "description": "{long}"}}
            </script></head><body><div class="job-description">short</div></body></html>"#
        );

        let (method, _) = extract_static(&html).expect("structured strategy should win");
        assert_eq!(method, ExtractionMethod::Structured);
    }

    #[test]
    fn nothing_usable_is_none() {
        assert!(extract_static("<html><body><p>x</p></body></html>").is_none());
    }
}
