//! Polite HTTP fetching for extraction and crawling.
//!
//! Rotates through a pool of realistic browser user-agent strings and sleeps
//! a small randomized interval before every request so the client never hits
//! a host in a tight loop. Timeouts are bounded per request.

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use reqwest::header::USER_AGENT;

use crate::error::AppError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
];

/// Request-interval jitter band, milliseconds.
const JITTER_MS: std::ops::RangeInclusive<u64> = 300..=1000;

#[derive(Clone)]
pub struct PoliteFetcher {
    client: Client,
    timeout_secs: u64,
}

impl PoliteFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Fetch a page body, jittered and with a rotated user agent.
    pub async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let (wait_ms, agent) = {
            let mut rng = rand::rng();
            let wait_ms = rng.random_range(JITTER_MS);
            let agent = USER_AGENTS[rng.random_range(0..USER_AGENTS.len())];
            (wait_ms, agent)
        };
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, agent)
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Http(format!("Failed to read response body: {e}")))
    }
}
