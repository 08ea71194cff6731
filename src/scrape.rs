//! Page-scraping collaborator.
//!
//! Scrapes never fail from the caller's point of view: transport and API
//! errors come back as a [`ScrapeData`] with `success = false`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use hackscope_core::models::{page_slug, ScrapeData};

use crate::config::ScrapeConfig;

#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> ScrapeData;
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeBody>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeBody {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Firecrawl `/v1/scrape` client.
pub struct FirecrawlClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl FirecrawlClient {
    pub fn new(config: &ScrapeConfig, api_key: String) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        // The HTTP deadline leaves headroom over the server-side scrape timeout.
        let http = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    async fn try_scrape(&self, url: &str) -> Result<ScrapeData, String> {
        let body = json!({
            "url": url,
            "formats": ["markdown"],
            "onlyMainContent": false,
            "timeout": self.timeout.as_millis() as u64,
        });

        let resp = self
            .http
            .post(format!("{}/v1/scrape", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("scrape of {} timed out", url)
                } else {
                    e.to_string()
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Firecrawl API error {}: {}", status, text));
        }

        let parsed: ScrapeResponse = resp.json().await.map_err(|e| e.to_string())?;
        if !parsed.success {
            return Err(parsed
                .error
                .unwrap_or_else(|| "Firecrawl reported failure".to_string()));
        }

        let data = parsed
            .data
            .filter(|d| !d.markdown.trim().is_empty())
            .ok_or_else(|| format!("Firecrawl returned empty result for {}", url))?;

        let metadata = data.metadata.unwrap_or_else(|| {
            tracing::warn!(url, "no metadata returned, using placeholder");
            json!({ "title": page_slug(url) })
        });

        Ok(ScrapeData {
            success: true,
            markdown: data.markdown,
            metadata,
            error: None,
        })
    }
}

#[async_trait]
impl PageScraper for FirecrawlClient {
    async fn scrape(&self, url: &str) -> ScrapeData {
        tracing::info!(url, "scraping page");
        match self.try_scrape(url).await {
            Ok(data) => {
                tracing::info!(url, chars = data.markdown.len(), "scrape succeeded");
                data
            }
            Err(e) => {
                tracing::error!(url, error = %e, "scrape failed");
                ScrapeData::failed(url, e)
            }
        }
    }
}
