//! Government-feed collector: RSS 2.0 syndication over plain HTTP GET.
//!
//! Feed contract: `<item>` elements carry `title`, `link` (absolute posting
//! URL), `guid`, `pubDate` (RFC 2822), `description`, `author` (the hiring
//! agency) and `category` (duty location). Items missing any of the required
//! fields are discarded before they enter the canonical stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::collectors::JobCollector;
use crate::error::AppError;
use crate::models::job::{JobRecord, Source, SourceQuery, infer_experience_level, infer_work_type};

pub struct GovFeedCollector {
    client: reqwest::Client,
    feed_url: String,
}

impl GovFeedCollector {
    pub fn new(client: reqwest::Client, feed_url: impl Into<String>) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[async_trait]
impl JobCollector for GovFeedCollector {
    fn source(&self) -> Source {
        Source::GovFeed
    }

    async fn fetch_page(&self, query: &SourceQuery) -> Result<Vec<JobRecord>, AppError> {
        let response = self
            .client
            .get(&self.feed_url)
            .query(&[
                ("keywords", query.keywords.as_str()),
                ("location", query.location.as_str()),
                ("page", &query.page.to_string()),
                ("per_page", &query.results_per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(e, 30))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "feed returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read feed body: {e}")))?;

        parse_feed(&body)
    }
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<JobRecord>, AppError> {
    let cleaned = scrub_entities(xml);
    let rss: Rss = quick_xml::de::from_str(&cleaned)
        .map_err(|e| AppError::Parse(format!("invalid RSS: {e}")))?;

    let mut records = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        match map_item(item) {
            Some(record) => records.push(record),
            None => tracing::debug!("discarding feed item with missing required fields"),
        }
    }
    Ok(records)
}

fn map_item(item: Item) -> Option<JobRecord> {
    let title = non_empty(item.title)?;
    let company = non_empty(item.author)?;
    let location = non_empty(item.category)?;
    let description = non_empty(item.description)?;
    let url = non_empty(item.link).filter(|link| link.starts_with("http"))?;

    let external_id = item
        .guid
        .and_then(|g| g.value)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| url.clone());

    let posted_at = item.pub_date.as_deref().and_then(parse_rfc2822);
    let haystack = format!("{title} {description}");

    Some(JobRecord {
        work_type: infer_work_type(&haystack),
        experience_level: infer_experience_level(&haystack),
        title,
        company,
        location,
        description,
        url,
        source: Source::GovFeed,
        external_id,
        posted_at,
        salary_min: None,
        salary_max: None,
        scraped_at: Utc::now(),
        expires_at: None,
    })
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Feeds in the wild ship HTML entities that are not valid XML.
fn scrub_entities(xml: &str) -> String {
    xml.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0"><channel>
        <title>Public Sector Vacancies</title>
        <item>
            <title>Senior Records Analyst</title>
            <link>https://jobs.agency.gov/postings/4411</link>
            <guid isPermaLink="false">vacancy-4411</guid>
            <pubDate>Mon, 03 Aug 2026 09:30:00 GMT</pubDate>
            <description>Analyze and digitize archival records. Remote work possible.</description>
            <author>National Archives</author>
            <category>Washington, DC</category>
        </item>
        <item>
            <title>Incomplete Item</title>
            <link>https://jobs.agency.gov/postings/4412</link>
            <description>No agency on this one.</description>
            <category>Denver, CO</category>
        </item>
        </channel></rss>"#;

    #[test]
    fn parses_items_and_discards_incomplete_ones() {
        let records = parse_feed(FEED).expect("feed parses");
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.title, "Senior Records Analyst");
        assert_eq!(r.company, "National Archives");
        assert_eq!(r.location, "Washington, DC");
        assert_eq!(r.external_id, "vacancy-4411");
        assert_eq!(r.source, Source::GovFeed);
        assert!(r.posted_at.is_some());
        assert_eq!(r.work_type.as_deref(), Some("remote"));
        assert_eq!(r.experience_level.as_deref(), Some("senior"));
    }

    #[test]
    fn guid_falls_back_to_link() {
        let feed = FEED.replace("<guid isPermaLink=\"false\">vacancy-4411</guid>", "");
        let records = parse_feed(&feed).expect("feed parses");
        assert_eq!(records[0].external_id, "https://jobs.agency.gov/postings/4411");
    }

    #[test]
    fn entity_scrub_keeps_feed_parseable() {
        let feed = FEED.replace("Analyze and", "Analyze&nbsp;and");
        assert!(parse_feed(&feed).is_ok());
    }

    #[test]
    fn invalid_xml_is_a_parse_error() {
        assert!(matches!(parse_feed("<rss><chan"), Err(AppError::Parse(_))));
    }

    #[test]
    fn empty_channel_yields_no_records() {
        let feed = r#"<rss><channel><title>empty</title></channel></rss>"#;
        assert!(parse_feed(feed).expect("parses").is_empty());
    }
}
