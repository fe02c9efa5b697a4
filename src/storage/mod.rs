pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::model::{Format, ImageLink, NewProduct, StorageError, UpsertError, Upserted};
use async_trait::async_trait;

/// The shop's product database as seen by the reconciler.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// First format row, used as the format of every created product.
    async fn first_format(&self) -> Result<Option<Format>, StorageError>;

    async fn create_format(&self, name: &str) -> Result<Format, StorageError>;

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<String>, StorageError>;

    async fn create_product(&self, product: &NewProduct) -> Result<String, StorageError>;

    async fn update_price(&self, product_id: &str, price: f64) -> Result<(), StorageError>;

    /// Inserts an image with display order 0 when the product has none, otherwise
    /// overwrites the URL of its first image.
    async fn set_primary_image(&self, product_id: &str, image_url: &str)
        -> Result<ImageLink, StorageError>;

    /// Sets `price` on every product whose price differs; returns how many changed.
    async fn update_all_prices(&self, price: f64) -> Result<usize, StorageError>;

    /// Slug lookup then insert or price update. Not atomic across concurrent runs.
    async fn create_or_update(&self, product: &NewProduct) -> Result<Upserted, UpsertError> {
        match self.find_product_by_slug(&product.slug).await? {
            Some(id) => match self.update_price(&id, product.price).await {
                Ok(()) => Ok(Upserted { id, created: false }),
                Err(source) => Err(UpsertError::PriceUpdate { id, source }),
            },
            None => {
                let id = self.create_product(product).await?;
                Ok(Upserted { id, created: true })
            }
        }
    }
}

pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ProductStore>, StorageError> {
    Ok(match config {
        StoreConfig::Sqlite { path } => Box::new(SqliteStore::new(path)?),
        StoreConfig::Rest { url, api_key } => Box::new(RestStore::new(url, api_key)?),
    })
}
