//! Aggregator-API collector.
//!
//! The upstream search endpoint takes its whole filter state as one `s`
//! query parameter: a JSON document that is percent-encoded the way
//! `encodeURIComponent` would, then base64-encoded. Responses are JSON with
//! a `results` array of listing objects.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::collectors::JobCollector;
use crate::error::AppError;
use crate::models::job::{JobRecord, Source, SourceQuery, infer_experience_level, infer_work_type};

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub struct AggregatorCollector {
    client: reqwest::Client,
    base_url: String,
}

impl AggregatorCollector {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

/// Search state the API expects inside the encoded `s` parameter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchState<'a> {
    query: &'a str,
    location: &'a str,
    workplace_types: [&'static str; 3],
    date_posted_past_n_days: u32,
}

impl<'a> SearchState<'a> {
    fn for_query(query: &'a SourceQuery) -> Self {
        Self {
            query: &query.keywords,
            location: &query.location,
            workplace_types: ["Remote", "Hybrid", "Onsite"],
            date_posted_past_n_days: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawListing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListing {
    id: Option<String>,
    title: Option<String>,
    company_name: Option<String>,
    formatted_location: Option<String>,
    description: Option<String>,
    apply_url: Option<String>,
    posted_at: Option<DateTime<Utc>>,
    yearly_min_compensation: Option<f64>,
    yearly_max_compensation: Option<f64>,
}

#[async_trait]
impl JobCollector for AggregatorCollector {
    fn source(&self) -> Source {
        Source::Aggregator
    }

    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        let state = SearchState::for_query(query);
        let encoded = encode_state(&state)?;
        let url = format!(
            "{}/api/search-jobs?s={}&size={}&page={}",
            self.base_url,
            utf8_percent_encode(&encoded, ENCODE_URI_COMPONENT_SET),
            query.results_per_page,
            query.page
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(e, 30))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "aggregator returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("invalid aggregator response: {e}")))?;

        let mut records = Vec::with_capacity(parsed.results.len());
        for raw in parsed.results {
            match map_listing(raw) {
                Some(record) => records.push(record),
                None => tracing::debug!("discarding aggregator listing with missing fields"),
            }
        }
        Ok(records)
    }
}

/// JSON -> encodeURIComponent -> base64, the encoding the API was built for.
fn encode_state(state: &SearchState<'_>) -> Result<String, AppError> {
    let json = serde_json::to_string(state)
        .map_err(|e| AppError::Internal(format!("state serialization failed: {e}")))?;
    let uri_encoded = utf8_percent_encode(&json, ENCODE_URI_COMPONENT_SET).to_string();
    Ok(BASE64.encode(uri_encoded.as_bytes()))
}

fn map_listing(raw: RawListing) -> Option<JobRecord> {
    let title = trimmed(raw.title)?;
    let company = trimmed(raw.company_name)?;
    let description = trimmed(raw.description)?;
    let url = trimmed(raw.apply_url).filter(|u| u.starts_with("http"))?;
    let external_id = trimmed(raw.id)?;
    let location = trimmed(raw.formatted_location).unwrap_or_else(|| "Unspecified".to_string());

    let haystack = format!("{title} {description}");

    Some(JobRecord {
        work_type: infer_work_type(&haystack),
        experience_level: infer_experience_level(&haystack),
        title,
        company,
        location,
        description,
        url,
        source: Source::Aggregator,
        external_id,
        posted_at: raw.posted_at,
        salary_min: raw.yearly_min_compensation.map(|v| v as i64),
        salary_max: raw.yearly_max_compensation.map(|v| v as i64),
        scraped_at: Utc::now(),
        expires_at: None,
    })
}

fn trimmed(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_encoding_is_base64_of_uri_encoded_json() {
        let query = SourceQuery::new("rust engineer", "Berlin");
        let state = SearchState::for_query(&query);
        let encoded = encode_state(&state).expect("encodes");

        let decoded = BASE64.decode(encoded.as_bytes()).expect("valid base64");
        let uri_encoded = String::from_utf8(decoded).expect("utf8");
        assert!(uri_encoded.contains("rust%20engineer"));
        assert!(uri_encoded.contains("%22location%22"));
    }

    #[test]
    fn listing_with_all_fields_maps_to_record() {
        let raw = RawListing {
            id: Some("agg-991".to_string()),
            title: Some("Platform Engineer".to_string()),
            company_name: Some("Example Inc".to_string()),
            formatted_location: Some("Remote, US".to_string()),
            description: Some("Operate a remote-first ingestion platform.".to_string()),
            apply_url: Some("https://boards.example.com/jobs/991".to_string()),
            posted_at: None,
            yearly_min_compensation: Some(130000.0),
            yearly_max_compensation: Some(160000.0),
        };

        let record = map_listing(raw).expect("maps");
        assert_eq!(record.external_id, "agg-991");
        assert_eq!(record.salary_min, Some(130000));
        assert_eq!(record.salary_max, Some(160000));
        assert_eq!(record.work_type.as_deref(), Some("remote"));
        assert_eq!(record.source, Source::Aggregator);
    }

    #[test]
    fn listing_missing_company_is_discarded() {
        let raw = RawListing {
            id: Some("agg-992".to_string()),
            title: Some("Mystery Role".to_string()),
            company_name: None,
            formatted_location: None,
            description: Some("Who is hiring?".to_string()),
            apply_url: Some("https://boards.example.com/jobs/992".to_string()),
            posted_at: None,
            yearly_min_compensation: None,
            yearly_max_compensation: None,
        };
        assert!(map_listing(raw).is_none());
    }

    #[test]
    fn relative_apply_url_is_discarded() {
        let raw = RawListing {
            id: Some("agg-993".to_string()),
            title: Some("Backend Role".to_string()),
            company_name: Some("Example".to_string()),
            formatted_location: None,
            description: Some("desc".to_string()),
            apply_url: Some("/jobs/993".to_string()),
            posted_at: None,
            yearly_min_compensation: None,
            yearly_max_compensation: None,
        };
        assert!(map_listing(raw).is_none());
    }
}
