use crate::model::ScraperError;
use crate::scraper::Scraper;

use reqwest::Client;
use std::time::Duration;

pub struct ScraperImpl {
    client: Client,
}

impl ScraperImpl {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) CatalogReconciler/0.1")
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ScraperError::HttpError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Scraper for ScraperImpl {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout
            } else {
                ScraperError::HttpError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ScraperError::InvalidResponse(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ScraperError::HttpError(e.to_string()))
    }
}
