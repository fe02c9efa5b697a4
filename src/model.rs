// Core structs: ScrapedEntry, MatchResult, NewProduct and the error types
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One `(href, src)` pair pulled out of a product card, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedEntry {
    pub key: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Number,
    Text,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Number => write!(f, "number"),
            MatchType::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub match_type: MatchType,
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Format {
    pub id: String,
    pub name: String,
}

/// Row written to the `products` table when a canonical name has no product yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub format_id: String,
    pub description: String,
    pub price: f64,
    pub stock_status: String,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub id: String,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLink {
    Inserted,
    Updated,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub matched: usize,
    pub unmatched: usize,
    pub created: usize,
    pub updated: usize,
    pub images_linked: usize,
    pub failures: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    InvalidResponse(u16),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("invalid CSS selector {0}")]
    InvalidSelector(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot access catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("store responded [{status}]: {body}")]
    ApiError { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("record not found")]
    NotFound,
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Decode(e.to_string())
    }
}

/// Failure of a slug-keyed upsert. A failed price update still knows which
/// product it was meant for.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error(transparent)]
    Store(#[from] StorageError),
    #[error("price update failed for product {id}: {source}")]
    PriceUpdate {
        id: String,
        #[source]
        source: StorageError,
    },
}

impl UpsertError {
    pub fn product_id(&self) -> Option<&str> {
        match self {
            UpsertError::Store(_) => None,
            UpsertError::PriceUpdate { id, .. } => Some(id),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no formats found in database")]
    NoFormats,
    #[error("format lookup failed: {0}")]
    FormatLookup(#[source] StorageError),
}
