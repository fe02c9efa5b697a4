use crate::model::{Format, ImageLink, NewProduct, StorageError};
use crate::storage::ProductStore;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tokio::sync::Mutex;

/// Local product database with the same tables as the hosted store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the database and creates the tables if needed.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS formats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                format_id INTEGER NOT NULL REFERENCES formats(id),
                description TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL,
                stock_status TEXT NOT NULL,
                is_featured INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS product_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL REFERENCES products(id),
                image_url TEXT NOT NULL,
                display_order INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
impl SqliteStore {
    /// Price of the product with this slug.
    pub async fn price_of(&self, slug: &str) -> Result<Option<f64>, StorageError> {
        let conn = self.conn.lock().await;
        let price = conn
            .query_row(
                "SELECT price FROM products WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(price)
    }

    /// Image URLs of a product in insertion order.
    pub async fn image_urls(&self, product_id: &str) -> Result<Vec<String>, StorageError> {
        let id = parse_id(product_id)?;
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT image_url FROM product_images WHERE product_id = ?1 ORDER BY id ASC",
        )?;
        let urls = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }

    pub async fn product_count(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_id(id: &str) -> Result<i64, StorageError> {
    id.parse()
        .map_err(|_| StorageError::Decode(format!("invalid product id: {}", id)))
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn create_format(&self, name: &str) -> Result<Format, StorageError> {
        let conn = self.conn.lock().await;
        conn.execute("INSERT INTO formats (name) VALUES (?1)", params![name])?;
        Ok(Format {
            id: conn.last_insert_rowid().to_string(),
            name: name.to_string(),
        })
    }

    async fn first_format(&self) -> Result<Option<Format>, StorageError> {
        let conn = self.conn.lock().await;
        let format = conn
            .query_row(
                "SELECT id, name FROM formats ORDER BY id ASC LIMIT 1",
                [],
                |row| {
                    Ok(Format {
                        id: row.get::<_, i64>(0)?.to_string(),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(format)
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().await;
        let id = conn
            .query_row(
                "SELECT id FROM products WHERE slug = ?1",
                params![slug],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|id| id.to_string()))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<String, StorageError> {
        let format_id = parse_id(&product.format_id)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO products (
                name, slug, format_id, description, price,
                stock_status, is_featured, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &product.name,
                &product.slug,
                format_id,
                &product.description,
                product.price,
                &product.stock_status,
                product.is_featured,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid().to_string())
    }

    async fn update_price(&self, product_id: &str, price: f64) -> Result<(), StorageError> {
        let id = parse_id(product_id)?;
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE products SET price = ?1, updated_at = ?2 WHERE id = ?3",
            params![price, Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_primary_image(
        &self,
        product_id: &str,
        image_url: &str,
    ) -> Result<ImageLink, StorageError> {
        let id = parse_id(product_id)?;
        let conn = self.conn.lock().await;
        let existing = conn
            .query_row(
                "SELECT id FROM product_images WHERE product_id = ?1 ORDER BY id ASC LIMIT 1",
                params![id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match existing {
            Some(image_id) => {
                conn.execute(
                    "UPDATE product_images SET image_url = ?1 WHERE id = ?2",
                    params![image_url, image_id],
                )?;
                Ok(ImageLink::Updated)
            }
            None => {
                conn.execute(
                    "INSERT INTO product_images (product_id, image_url, display_order)
                     VALUES (?1, ?2, 0)",
                    params![id, image_url],
                )?;
                Ok(ImageLink::Inserted)
            }
        }
    }

    async fn update_all_prices(&self, price: f64) -> Result<usize, StorageError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE products SET price = ?1, updated_at = ?2 WHERE price != ?1",
            params![price, Utc::now().to_rfc3339()],
        )?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, slug: &str, format_id: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.into(),
            slug: slug.into(),
            format_id: format_id.into(),
            description: format!("Generic description for {}", name),
            price,
            stock_status: "in_stock".into(),
            is_featured: false,
        }
    }

    #[tokio::test]
    async fn first_format_is_none_on_empty_db() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.first_format().await.unwrap(), None);

        let id = store.create_format("10x10").await.unwrap().id;
        store.create_format("5x5").await.unwrap();
        let format = store.first_format().await.unwrap().unwrap();
        assert_eq!(format.id, id);
        assert_eq!(format.name, "10x10");
    }

    #[tokio::test]
    async fn create_or_update_is_keyed_by_slug() {
        let store = SqliteStore::open_in_memory().unwrap();
        let format_id = store.create_format("10x10").await.unwrap().id;

        let first = store
            .create_or_update(&product("TABAC N° 45", "tabac-n-45", &format_id, 45.0))
            .await
            .unwrap();
        assert!(first.created);

        let second = store
            .create_or_update(&product("TABAC N° 45", "tabac-n-45", &format_id, 60.0))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(store.price_of("tabac-n-45").await.unwrap(), Some(60.0));
        assert_eq!(store.product_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn primary_image_is_inserted_then_overwritten() {
        let store = SqliteStore::open_in_memory().unwrap();
        let format_id = store.create_format("10x10").await.unwrap().id;
        let id = store
            .create_product(&product("CIELO N° 32", "cielo-n-32", &format_id, 45.0))
            .await
            .unwrap();

        assert_eq!(
            store.set_primary_image(&id, "https://x/a.jpg").await.unwrap(),
            ImageLink::Inserted
        );
        assert_eq!(
            store.set_primary_image(&id, "https://x/b.jpg").await.unwrap(),
            ImageLink::Updated
        );
        assert_eq!(store.image_urls(&id).await.unwrap(), vec!["https://x/b.jpg"]);
    }

    #[tokio::test]
    async fn update_all_prices_only_touches_different_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let format_id = store.create_format("10x10").await.unwrap().id;
        for (slug, price) in [("a", 45.0), ("b", 289.0), ("c", 12.5)] {
            store
                .create_product(&product(slug, slug, &format_id, price))
                .await
                .unwrap();
        }

        assert_eq!(store.update_all_prices(289.0).await.unwrap(), 2);
        assert_eq!(store.price_of("c").await.unwrap(), Some(289.0));
        assert_eq!(store.update_all_prices(289.0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_price_of_unknown_product_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.update_price("42", 10.0).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            store.update_price("not-a-number", 10.0).await,
            Err(StorageError::Decode(_))
        ));
    }
}
