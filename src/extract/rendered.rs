//! Rendered-browser strategy support: headless Chromium over CDP.
//!
//! One Chromium process is shared for the lifetime of the engine; each fetch
//! opens a tab, waits for `<body>` to exist, grabs the live DOM and closes
//! the tab. Pages that build their content with JavaScript are invisible to
//! the static strategies and only yield here.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;

use crate::error::AppError;

#[derive(Clone)]
pub struct BrowserHandle {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserHandle {
    /// Launches headless Chromium with the given navigation timeout.
    /// Requires a Chrome/Chromium binary reachable through the usual paths.
    pub async fn launch(timeout: Duration) -> Result<Self, AppError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| AppError::Internal(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to launch browser: {e}")))?;

        // The CDP event handler must be polled for the connection to stay alive.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    /// Navigate, wait for body content, and return the rendered DOM.
    pub async fn fetch_rendered(&self, url: &str) -> Result<String, AppError> {
        let attempt = async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| AppError::Http(format!("Failed to navigate to {url}: {e}")))?;

            page.find_element("body")
                .await
                .map_err(|e| AppError::Http(format!("Page did not render body: {e}")))?;

            let html = page
                .content()
                .await
                .map_err(|e| AppError::Http(format!("Failed to read page content: {e}")))?;

            let _ = page.close().await;
            Ok::<String, AppError>(html)
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
    }
}
