pub mod fetcher;

pub use fetcher::ScraperImpl;

use crate::config::PageSource;
use crate::model::ScraperError;
use rand::Rng;
use std::fs;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

/// Downloads every page that has a URL into its path, one at a time.
/// Returns how many pages were saved; failures are logged and skipped.
pub async fn fetch_pages(scraper: &dyn Scraper, pages: &[PageSource], delay_ms: u64) -> usize {
    let mut saved = 0;
    let mut first = true;

    for page in pages {
        let Some(url) = page.url.as_deref() else {
            continue;
        };

        if !first && delay_ms > 0 {
            let jitter = rand::rng().random_range(0..=delay_ms / 2);
            sleep(Duration::from_millis(delay_ms + jitter)).await;
        }
        first = false;

        info!("Fetching {}...", url);
        let html = match scraper.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                continue;
            }
        };

        if let Some(parent) = page.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), e);
                continue;
            }
        }
        match fs::write(&page.path, &html) {
            Ok(()) => {
                info!("Saved {} ({} bytes)", page.path.display(), html.len());
                saved += 1;
            }
            Err(e) => warn!("Failed to write {}: {}", page.path.display(), e),
        }
    }

    saved
}
