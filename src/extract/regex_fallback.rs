//! Last-resort strategy: pattern-match raw HTML when no parser got traction.
//!
//! Looks for description-shaped container blocks by class/id hints and an
//! `<h1>` (or `<title>`) for the title. Only runs after the structured, DOM
//! and rendered strategies all came up short.

use std::sync::LazyLock;

use regex::Regex;

use crate::extract::dom::html_to_text;
use crate::extract::{ExtractedJob, parse_salary_range};

static DESCRIPTION_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:div|section)[^>]*(?:class|id)\s*=\s*["'][^"']*(?:description|job-detail|posting|vacancy)[^"']*["'][^>]*>(.*?)</(?:div|section)>"#,
    )
    .expect("hardcoded regex compiles")
});

static PARAGRAPH_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)((?:<p[^>]*>.*?</p>\s*){3,})").expect("hardcoded regex compiles")
});

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("hardcoded regex compiles"));

static TITLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("hardcoded regex compiles"));

pub fn parse(html: &str) -> Option<ExtractedJob> {
    let description = longest_description_block(html)?;
    let title = title_from(html);
    let (salary_min, salary_max) = parse_salary_range(&description);

    Some(ExtractedJob {
        title,
        company: None,
        location: None,
        description,
        salary_min,
        salary_max,
    })
}

/// Longest description-hinted block; paragraph runs as a fallback for pages
/// with no helpful class names at all.
fn longest_description_block(html: &str) -> Option<String> {
    let mut best: Option<String> = None;

    for captures in DESCRIPTION_BLOCK_RE.captures_iter(html) {
        if let Some(block) = captures.get(1) {
            let text = html_to_text(block.as_str());
            if best.as_ref().is_none_or(|b| text.len() > b.len()) && !text.is_empty() {
                best = Some(text);
            }
        }
    }

    if best.is_none()
        && let Some(captures) = PARAGRAPH_RUN_RE.captures(html)
        && let Some(run) = captures.get(1)
    {
        let text = html_to_text(run.as_str());
        if !text.is_empty() {
            best = Some(text);
        }
    }

    best
}

fn title_from(html: &str) -> Option<String> {
    H1_RE
        .captures(html)
        .or_else(|| TITLE_TAG_RE.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| html_to_text(m.as_str()))
        .filter(|t| !t.is_empty())
}
