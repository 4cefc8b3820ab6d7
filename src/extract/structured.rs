//! Structured-data strategy: schema.org `JobPosting` JSON-LD.
//!
//! Cheapest and most reliable when present. Walks every
//! `<script type="application/ld+json">` block, including `@graph` wrappers
//! and top-level arrays, and takes the first `JobPosting` object found.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::extract::ExtractedJob;
use crate::extract::dom::html_to_text;

pub fn parse(html: &str) -> Option<ExtractedJob> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in doc.select(&selector) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        if let Some(job) = find_job_posting(&value) {
            return Some(job);
        }
    }
    None
}

fn find_job_posting(value: &Value) -> Option<ExtractedJob> {
    match value {
        Value::Array(items) => items.iter().find_map(find_job_posting),
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_job_posting_type) {
                from_job_posting(value)
            } else {
                map.get("@graph").and_then(find_job_posting)
            }
        }
        _ => None,
    }
}

fn is_job_posting_type(type_field: &Value) -> bool {
    match type_field {
        Value::String(s) => s == "JobPosting",
        Value::Array(items) => items.iter().any(|v| v.as_str() == Some("JobPosting")),
        _ => false,
    }
}

fn from_job_posting(posting: &Value) -> Option<ExtractedJob> {
    // JSON-LD descriptions routinely carry embedded HTML
    let description = posting
        .get("description")
        .and_then(Value::as_str)
        .map(html_to_text)?;

    let title = posting
        .get("title")
        .or_else(|| posting.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let company = posting
        .get("hiringOrganization")
        .and_then(organization_name)
        .or_else(|| {
            posting
                .get("hiringOrganization")
                .and_then(Value::as_str)
                .map(String::from)
        });

    let location = posting.get("jobLocation").and_then(location_name);

    let (salary_min, salary_max) = base_salary(posting);

    Some(ExtractedJob {
        title,
        company,
        location,
        description,
        salary_min,
        salary_max,
    })
}

fn organization_name(org: &Value) -> Option<String> {
    org.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// `jobLocation` can be an object, an array of objects, or occasionally a
/// plain string. Prefer locality + region from the postal address.
fn location_name(loc: &Value) -> Option<String> {
    match loc {
        Value::Array(items) => items.iter().find_map(location_name),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => {
            let address = loc.get("address")?;
            if let Some(s) = address.as_str() {
                return Some(s.trim().to_string()).filter(|s| !s.is_empty());
            }
            let locality = address.get("addressLocality").and_then(Value::as_str);
            let region = address
                .get("addressRegion")
                .or_else(|| address.get("addressCountry"))
                .and_then(Value::as_str);
            match (locality, region) {
                (Some(l), Some(r)) => Some(format!("{l}, {r}")),
                (Some(l), None) => Some(l.to_string()),
                (None, Some(r)) => Some(r.to_string()),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

fn base_salary(posting: &Value) -> (Option<i64>, Option<i64>) {
    let Some(salary) = posting.get("baseSalary") else {
        return (None, None);
    };

    // MonetaryAmount with a QuantitativeValue, or a bare number
    if let Some(value) = salary.get("value") {
        let min = value
            .get("minValue")
            .or_else(|| value.get("value"))
            .and_then(Value::as_f64)
            .map(|v| v as i64);
        let max = value.get("maxValue").and_then(Value::as_f64).map(|v| v as i64);
        return (min, max);
    }
    let flat = salary.as_f64().map(|v| v as i64);
    (flat, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{json}</script></head><body></body></html>"#
        )
    }

    #[test]
    fn parses_a_plain_job_posting_block() {
        let html = page(
            r#"{
                "@context": "https://schema.org",
                "@type": "JobPosting",
                "title": "Backend Engineer",
                "description": "<p>Build and operate the listing ingestion services.</p>",
                "hiringOrganization": { "@type": "Organization", "name": "Acme GmbH" },
                "jobLocation": { "@type": "Place", "address": { "addressLocality": "Berlin", "addressRegion": "BE" } },
                "baseSalary": { "@type": "MonetaryAmount", "value": { "minValue": 70000, "maxValue": 90000 } }
            }"#,
        );

        let job = parse(&html).expect("posting found");
        assert_eq!(job.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(job.company.as_deref(), Some("Acme GmbH"));
        assert_eq!(job.location.as_deref(), Some("Berlin, BE"));
        assert!(job.description.contains("ingestion services"));
        assert_eq!(job.salary_min, Some(70000));
        assert_eq!(job.salary_max, Some(90000));
    }

    #[test]
    fn finds_posting_inside_graph_wrapper() {
        let html = page(
            r#"{
                "@context": "https://schema.org",
                "@graph": [
                    { "@type": "WebSite", "name": "jobs" },
                    { "@type": "JobPosting", "title": "Data Engineer", "description": "Pipelines." }
                ]
            }"#,
        );

        let job = parse(&html).expect("posting found");
        assert_eq!(job.title.as_deref(), Some("Data Engineer"));
    }

    #[test]
    fn ignores_non_posting_blocks_and_invalid_json() {
        let html = r#"<html><head>
            <script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@type": "Organization", "name": "x"}</script>
            </head><body></body></html>"#;
        assert!(parse(html).is_none());
    }

    #[test]
    fn missing_description_is_not_a_posting() {
        let html = page(r#"{"@type": "JobPosting", "title": "No description"}"#);
        assert!(parse(&html).is_none());
    }
}
