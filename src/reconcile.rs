// Bulk reconciliation: match each product name, report it, and in apply mode
// push price and primary image into the product store
use crate::catalog::ScrapedCatalog;
use crate::matcher::find_best_image;
use crate::model::{ImageLink, MatchResult, NewProduct, ReconcileError, RunReport};
use crate::storage::ProductStore;
use crate::utils::{file_name, to_slug};
use std::io::Write;
use tracing::{error, info, warn};

pub const NO_MATCH: &str = "NO MATCH FOUND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Report only.
    Debug,
    Apply,
}

/// `<key_or_marker> | <match_type> | <url_or_missing>`
pub fn report_line(result: Option<&MatchResult>) -> String {
    match result {
        Some(m) => format!("{} | {} | {}", m.key, m.match_type, m.url),
        None => format!("{} | none | missing", NO_MATCH),
    }
}

pub fn new_product(name: &str, format_id: &str, price: f64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        slug: to_slug(name),
        format_id: format_id.to_string(),
        description: format!("Generic description for {}", name),
        price,
        stock_status: "in_stock".into(),
        is_featured: false,
    }
}

pub struct Reconciler<'a, W: Write> {
    catalog: &'a ScrapedCatalog,
    out: W,
}

impl<'a, W: Write> Reconciler<'a, W> {
    pub fn new(catalog: &'a ScrapedCatalog, out: W) -> Self {
        Self { catalog, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn match_and_report(&mut self, name: &str, report: &mut RunReport) -> Option<MatchResult> {
        let result = find_best_image(name, self.catalog);
        info!("Product: {}", name);
        if let Err(e) = writeln!(self.out, "{}", report_line(result.as_ref())) {
            warn!("Failed to write report line: {}", e);
        }
        match &result {
            Some(_) => report.matched += 1,
            None => report.unmatched += 1,
        }
        result
    }

    /// Dry run: matches and report lines only.
    pub fn debug(&mut self, products: &[String]) -> RunReport {
        let mut report = RunReport::default();
        for name in products {
            self.match_and_report(name, &mut report);
        }
        report
    }

    pub async fn apply(
        &mut self,
        products: &[String],
        store: &dyn ProductStore,
        price: f64,
    ) -> Result<RunReport, ReconcileError> {
        info!("Initializing with price: {}...", price);
        info!("Fetching formats...");
        let format = store
            .first_format()
            .await
            .map_err(ReconcileError::FormatLookup)?
            .ok_or(ReconcileError::NoFormats)?;
        info!("Using format ID: {} ({})", format.id, format.name);

        let mut report = RunReport::default();

        for name in products {
            let matched = self.match_and_report(name, &mut report);
            let product = new_product(name, &format.id, price);

            // The image step still runs when only the price update failed.
            let product_id = match store.create_or_update(&product).await {
                Ok(upserted) => {
                    if upserted.created {
                        info!("Inserted {} (Price: {})", name, price);
                        report.created += 1;
                    } else {
                        info!("Updated price and verified: {}", name);
                        report.updated += 1;
                    }
                    upserted.id
                }
                Err(e) => {
                    error!("ERROR saving {}: {}", name, e);
                    report.failures += 1;
                    match e.product_id() {
                        Some(id) => id.to_string(),
                        None => continue,
                    }
                }
            };

            let Some(matched) = matched else {
                continue;
            };
            match store.set_primary_image(&product_id, &matched.url).await {
                Ok(ImageLink::Inserted) => {
                    info!("Linked image: {}", file_name(&matched.url));
                    report.images_linked += 1;
                }
                Ok(ImageLink::Updated) => {
                    info!("Updated image URL for {}", name);
                    report.images_linked += 1;
                }
                Err(e) => {
                    warn!("Failed to link image for {}: {}", name, e);
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Format, StorageError};
    use crate::storage::SqliteStore;
    use async_trait::async_trait;

    fn catalog() -> ScrapedCatalog {
        vec![
            (
                "gustavian blue n 21".to_string(),
                "https://www.zellige-maroc.com/produits/big/bleu_gustavien.jpg".to_string(),
            ),
            (
                "soft green n 22".to_string(),
                "https://www.zellige-maroc.com/produits/big/vert_tendre_22.jpg".to_string(),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn output(reconciler: Reconciler<'_, Vec<u8>>) -> Vec<String> {
        String::from_utf8(reconciler.into_output())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn debug_mode_prints_one_line_per_product() {
        let catalog = catalog();
        let mut reconciler = Reconciler::new(&catalog, Vec::new());

        let report = reconciler.debug(&names(&["GUSTAVIAN BLUE N° 21", "TABAC N° 45"]));

        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(
            output(reconciler),
            vec![
                "gustavian blue n 21 | number | https://www.zellige-maroc.com/produits/big/bleu_gustavien.jpg",
                "NO MATCH FOUND | none | missing",
            ]
        );
    }

    #[tokio::test]
    async fn apply_creates_then_updates_without_duplicates() {
        let catalog = catalog();
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_format("10x10").await.unwrap();
        let products = names(&["GUSTAVIAN BLUE N° 21", "SOFT GREEN N° 22", "TABAC N° 45"]);

        let first = Reconciler::new(&catalog, Vec::new())
            .apply(&products, &store, 45.0)
            .await
            .unwrap();
        assert_eq!(first.created, 3);
        assert_eq!(first.images_linked, 2);
        assert_eq!(first.failures, 0);

        let second = Reconciler::new(&catalog, Vec::new())
            .apply(&products, &store, 50.0)
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 3);
        assert_eq!(store.product_count().await.unwrap(), 3);
        assert_eq!(store.price_of("soft-green-n-22").await.unwrap(), Some(50.0));

        let id = store.find_product_by_slug("soft-green-n-22").await.unwrap().unwrap();
        assert_eq!(
            store.image_urls(&id).await.unwrap(),
            vec!["https://www.zellige-maroc.com/produits/big/vert_tendre_22.jpg"]
        );
        let unmatched = store.find_product_by_slug("tabac-n-45").await.unwrap().unwrap();
        assert!(store.image_urls(&unmatched).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn apply_without_formats_is_fatal() {
        let catalog = catalog();
        let store = SqliteStore::open_in_memory().unwrap();

        let result = Reconciler::new(&catalog, Vec::new())
            .apply(&names(&["SOFT GREEN N° 22"]), &store, 45.0)
            .await;

        assert!(matches!(result, Err(ReconcileError::NoFormats)));
        assert_eq!(store.product_count().await.unwrap(), 0);
    }

    /// Fails chosen operations on top of an in-memory store.
    #[derive(Default)]
    struct FlakyStore {
        inner: Option<SqliteStore>,
        failing_slug: &'static str,
        format_lookup_fails: bool,
        price_update_fails: bool,
        image_link_fails: bool,
    }

    impl FlakyStore {
        async fn with_format() -> Self {
            let inner = SqliteStore::open_in_memory().unwrap();
            inner.create_format("10x10").await.unwrap();
            Self {
                inner: Some(inner),
                ..Default::default()
            }
        }

        fn inner(&self) -> &SqliteStore {
            self.inner.as_ref().unwrap()
        }
    }

    #[async_trait]
    impl ProductStore for FlakyStore {
        async fn first_format(&self) -> Result<Option<Format>, StorageError> {
            if self.format_lookup_fails {
                return Err(StorageError::ApiError {
                    status: 500,
                    body: "down".into(),
                });
            }
            self.inner().first_format().await
        }

        async fn create_format(&self, name: &str) -> Result<Format, StorageError> {
            self.inner().create_format(name).await
        }

        async fn find_product_by_slug(&self, slug: &str) -> Result<Option<String>, StorageError> {
            self.inner().find_product_by_slug(slug).await
        }

        async fn create_product(&self, product: &NewProduct) -> Result<String, StorageError> {
            if product.slug == self.failing_slug {
                return Err(StorageError::ApiError {
                    status: 409,
                    body: "conflict".into(),
                });
            }
            self.inner().create_product(product).await
        }

        async fn update_price(&self, product_id: &str, price: f64) -> Result<(), StorageError> {
            if self.price_update_fails {
                return Err(StorageError::NotFound);
            }
            self.inner().update_price(product_id, price).await
        }

        async fn set_primary_image(
            &self,
            product_id: &str,
            image_url: &str,
        ) -> Result<ImageLink, StorageError> {
            if self.image_link_fails {
                return Err(StorageError::ApiError {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.inner().set_primary_image(product_id, image_url).await
        }

        async fn update_all_prices(&self, price: f64) -> Result<usize, StorageError> {
            self.inner().update_all_prices(price).await
        }
    }

    #[tokio::test]
    async fn per_product_failure_does_not_abort_the_run() {
        let catalog = catalog();
        let store = FlakyStore {
            failing_slug: "gustavian-blue-n-21",
            ..FlakyStore::with_format().await
        };
        let mut reconciler = Reconciler::new(&catalog, Vec::new());

        let report = reconciler
            .apply(&names(&["GUSTAVIAN BLUE N° 21", "SOFT GREEN N° 22"]), &store, 45.0)
            .await
            .unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.created, 1);
        assert_eq!(report.images_linked, 1);
        assert_eq!(output(reconciler).len(), 2);
        assert!(store.find_product_by_slug("gustavian-blue-n-21").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn format_lookup_error_is_fatal() {
        let catalog = catalog();
        let store = FlakyStore {
            format_lookup_fails: true,
            ..FlakyStore::with_format().await
        };

        let result = Reconciler::new(&catalog, Vec::new())
            .apply(&names(&["SOFT GREEN N° 22"]), &store, 45.0)
            .await;

        assert!(matches!(result, Err(ReconcileError::FormatLookup(_))));
    }

    #[tokio::test]
    async fn failed_price_update_still_relinks_image() {
        let catalog = catalog();
        let seeded = FlakyStore::with_format().await;
        let format = seeded.inner().first_format().await.unwrap().unwrap();
        let id = seeded
            .inner()
            .create_product(&new_product("SOFT GREEN N° 22", &format.id, 45.0))
            .await
            .unwrap();
        seeded
            .inner()
            .set_primary_image(&id, "https://www.zellige-maroc.com/produits/big/old.jpg")
            .await
            .unwrap();
        let store = FlakyStore {
            price_update_fails: true,
            ..seeded
        };

        let report = Reconciler::new(&catalog, Vec::new())
            .apply(&names(&["SOFT GREEN N° 22"]), &store, 50.0)
            .await
            .unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.images_linked, 1);
        assert_eq!(store.inner().price_of("soft-green-n-22").await.unwrap(), Some(45.0));
        assert_eq!(
            store.inner().image_urls(&id).await.unwrap(),
            vec!["https://www.zellige-maroc.com/produits/big/vert_tendre_22.jpg"]
        );
    }

    #[tokio::test]
    async fn failed_image_link_is_counted_and_run_continues() {
        let catalog = catalog();
        let store = FlakyStore {
            image_link_fails: true,
            ..FlakyStore::with_format().await
        };
        let mut reconciler = Reconciler::new(&catalog, Vec::new());

        let report = reconciler
            .apply(&names(&["SOFT GREEN N° 22", "TABAC N° 45"]), &store, 45.0)
            .await
            .unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.created, 2);
        assert_eq!(report.images_linked, 0);
        assert_eq!(output(reconciler).len(), 2);
        assert!(store.find_product_by_slug("tabac-n-45").await.unwrap().is_some());
    }

    #[test]
    fn new_product_defaults() {
        let product = new_product("OLD PINK N° 16 (10x10)", "7", 45.0);
        assert_eq!(product.slug, "old-pink-n-16-10x10");
        assert_eq!(product.description, "Generic description for OLD PINK N° 16 (10x10)");
        assert_eq!(product.stock_status, "in_stock");
        assert!(!product.is_featured);
    }
}
