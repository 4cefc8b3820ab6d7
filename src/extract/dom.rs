//! DOM strategy: ranked CSS selectors over the static (or rendered) HTML.
//!
//! Script/style/nav/footer and similar non-content blocks are stripped
//! before parsing. Per field, every selector in the ranked list is tried and
//! the longest matching text block wins, which favors the actual posting
//! body over teaser snippets.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::{ExtractedJob, parse_salary_range};

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".job-description",
    "#job-description",
    "[class*=\"job-description\"]",
    "[class*=\"jobDescription\"]",
    "[class*=\"description\"]",
    "[itemprop=\"description\"]",
    ".posting-body",
    "article",
    "main",
    "[role=\"main\"]",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".job-title",
    "[class*=\"job-title\"]",
    "[itemprop=\"title\"]",
    "title",
];

const COMPANY_SELECTORS: &[&str] = &[
    ".company-name",
    "[class*=\"company\"]",
    "[itemprop=\"hiringOrganization\"]",
    "[data-company]",
];

const LOCATION_SELECTORS: &[&str] = &[
    ".job-location",
    "[class*=\"location\"]",
    "[itemprop=\"jobLocation\"]",
];

static NON_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<(script|style|noscript|nav|footer|aside|iframe|svg|form)\b.*?</(script|style|noscript|nav|footer|aside|iframe|svg|form)>",
    )
    .expect("hardcoded regex compiles")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("hardcoded regex compiles"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex compiles"));

/// Drop blocks that never contain posting content (scripts, chrome, ads).
pub fn clean_html(html: &str) -> String {
    let without_comments = COMMENT_RE.replace_all(html, " ");
    NON_CONTENT_RE.replace_all(&without_comments, " ").into_owned()
}

/// Flatten an HTML fragment to normalized plain text.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(&clean_html(html));
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn parse(html: &str) -> Option<ExtractedJob> {
    let doc = Html::parse_document(&clean_html(html));

    let description = longest_text(&doc, DESCRIPTION_SELECTORS)?;
    let title = longest_text(&doc, TITLE_SELECTORS);
    let company = longest_text(&doc, COMPANY_SELECTORS);
    let location = longest_text(&doc, LOCATION_SELECTORS);
    let (salary_min, salary_max) = parse_salary_range(&description);

    Some(ExtractedJob {
        title,
        company,
        location,
        description,
        salary_min,
        salary_max,
    })
}

/// Longest non-empty text block matched by any selector in the ranked list.
fn longest_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    let mut best: Option<String> = None;

    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in doc.select(&selector) {
            let text: String = element.text().collect::<Vec<_>>().join(" ");
            let text = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();
            if text.is_empty() {
                continue;
            }
            if best.as_ref().is_none_or(|b| text.len() > b.len()) {
                best = Some(text);
            }
        }
    }

    best
}
