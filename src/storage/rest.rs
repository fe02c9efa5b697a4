// PostgREST-style hosted product store (tables exposed under /rest/v1/)
use crate::model::{Format, ImageLink, NewProduct, StorageError};
use crate::storage::ProductStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct FormatRow {
    id: Value,
    name: String,
}

/// Ids are uuids on some deployments and integers on others.
fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl RestStore {
    pub fn new(url: &str, api_key: &str) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn read_rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StorageError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        debug!("store response [{}]: {}", status, body);
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StorageError> {
        let request = self.client.get(self.table_url(table)).query(query);
        let response = self.authorized(request).send().await?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: &str, body: &Value) -> Result<Vec<IdRow>, StorageError> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorized(request).send().await?;
        Self::read_rows(response).await
    }

    async fn patch(
        &self,
        table: &str,
        filter: &[(&str, String)],
        body: &Value,
    ) -> Result<Vec<IdRow>, StorageError> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(filter)
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorized(request).send().await?;
        Self::read_rows(response).await
    }
}

#[async_trait]
impl ProductStore for RestStore {
    async fn first_format(&self) -> Result<Option<Format>, StorageError> {
        let rows: Vec<FormatRow> = self
            .select(
                "formats",
                &[("select", "id,name".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| Format {
            id: id_string(&row.id),
            name: row.name,
        }))
    }

    async fn create_format(&self, name: &str) -> Result<Format, StorageError> {
        let rows = self.insert("formats", &json!({ "name": name })).await?;
        rows.first()
            .map(|row| Format {
                id: id_string(&row.id),
                name: name.to_string(),
            })
            .ok_or_else(|| StorageError::Decode("insert returned no row".into()))
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<String>, StorageError> {
        let rows: Vec<IdRow> = self
            .select(
                "products",
                &[
                    ("select", "id".to_string()),
                    ("slug", format!("eq.{}", slug)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.first().map(|row| id_string(&row.id)))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<String, StorageError> {
        let rows = self.insert("products", &json!([product])).await?;
        rows.first()
            .map(|row| id_string(&row.id))
            .ok_or_else(|| StorageError::Decode("insert returned no row".into()))
    }

    async fn update_price(&self, product_id: &str, price: f64) -> Result<(), StorageError> {
        let rows = self
            .patch(
                "products",
                &[("id", format!("eq.{}", product_id))],
                &json!({ "price": price }),
            )
            .await?;
        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_primary_image(
        &self,
        product_id: &str,
        image_url: &str,
    ) -> Result<ImageLink, StorageError> {
        let existing: Vec<IdRow> = self
            .select(
                "product_images",
                &[
                    ("select", "id".to_string()),
                    ("product_id", format!("eq.{}", product_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        match existing.first() {
            Some(row) => {
                self.patch(
                    "product_images",
                    &[("id", format!("eq.{}", id_string(&row.id)))],
                    &json!({ "image_url": image_url }),
                )
                .await?;
                Ok(ImageLink::Updated)
            }
            None => {
                self.insert(
                    "product_images",
                    &json!({
                        "product_id": product_id,
                        "image_url": image_url,
                        "display_order": 0
                    }),
                )
                .await?;
                Ok(ImageLink::Inserted)
            }
        }
    }

    async fn update_all_prices(&self, price: f64) -> Result<usize, StorageError> {
        let rows = self
            .patch(
                "products",
                &[("price", format!("neq.{}", price))],
                &json!({ "price": price }),
            )
            .await?;
        Ok(rows.len())
    }
}
