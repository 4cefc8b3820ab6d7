//! Social-network listing-index collector.
//!
//! JSON API with the credential passed as a query parameter. The response
//! nests each listing inside an edge/node envelope, the way the network's
//! public graph endpoints shape their pages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::collectors::JobCollector;
use crate::error::AppError;
use crate::models::job::{JobRecord, Source, SourceQuery, infer_experience_level, infer_work_type};

pub struct SocialBoardCollector {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SocialBoardCollector {
    /// Fails fast when the credential is absent; the caller decides whether
    /// that means "skip this source" or "abort the run".
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, AppError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::MissingConfig("social board API key".to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(default)]
    data: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: RawNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawNode {
    listing_id: Option<String>,
    position: Option<String>,
    company: Option<Company>,
    city: Option<String>,
    region: Option<String>,
    body: Option<String>,
    permalink: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Company {
    name: Option<String>,
}

#[async_trait]
impl JobCollector for SocialBoardCollector {
    fn source(&self) -> Source {
        Source::SocialBoard
    }

    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        let response = self
            .client
            .get(format!("{}/v2/listings", self.base_url))
            .query(&[
                ("q", query.keywords.as_str()),
                ("near", query.location.as_str()),
                ("page", &query.page.to_string()),
                ("limit", &query.results_per_page.to_string()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(e, 30))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::Http("social board rejected the API key".to_string()));
        }
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "social board returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: IndexResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("invalid social board response: {e}")))?;

        let mut records = Vec::with_capacity(parsed.data.len());
        for edge in parsed.data {
            match map_node(edge.node) {
                Some(record) => records.push(record),
                None => tracing::debug!("discarding social board node with missing fields"),
            }
        }
        Ok(records)
    }
}

fn map_node(node: RawNode) -> Option<JobRecord> {
    let title = trimmed(node.position)?;
    let company = trimmed(node.company.and_then(|c| c.name))?;
    let description = trimmed(node.body)?;
    let url = trimmed(node.permalink).filter(|u| u.starts_with("http"))?;
    let external_id = trimmed(node.listing_id)?;

    let location = match (trimmed(node.city), trimmed(node.region)) {
        (Some(city), Some(region)) => format!("{city}, {region}"),
        (Some(city), None) => city,
        (None, Some(region)) => region,
        (None, None) => "Unspecified".to_string(),
    };

    let haystack = format!("{title} {description}");

    Some(JobRecord {
        work_type: infer_work_type(&haystack),
        experience_level: infer_experience_level(&haystack),
        title,
        company,
        location,
        description,
        url,
        source: Source::SocialBoard,
        external_id,
        posted_at: node.published_at,
        salary_min: None,
        salary_max: None,
        scraped_at: Utc::now(),
        expires_at: None,
    })
}

fn trimmed(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
