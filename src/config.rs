use crate::model::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "CATALOG_STORE_API_KEY";

/// A catalog listing page: where it lives on disk and, optionally, where to fetch it from.
#[derive(Debug, Clone, Deserialize)]
pub struct PageSource {
    pub path: PathBuf,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    Marker,
    Selector,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Sqlite {
        path: PathBuf,
    },
    Rest {
        url: String,
        #[serde(default)]
        api_key: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: PathBuf::from("products.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_root")]
    pub site_root: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,
    #[serde(default = "default_block_marker")]
    pub block_marker: String,
    #[serde(default = "default_item_selector")]
    pub item_selector: String,
    #[serde(default)]
    pub extractor: ExtractorKind,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_root: default_site_root(),
            locale: default_locale(),
            link_prefix: default_link_prefix(),
            block_marker: default_block_marker(),
            item_selector: default_item_selector(),
            extractor: ExtractorKind::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub pages: Vec<PageSource>,
    pub products: Vec<String>,
    #[serde(default = "default_price")]
    pub default_price: f64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
}

fn default_site_root() -> String {
    "https://www.zellige-maroc.com/en/".into()
}

fn default_locale() -> String {
    "en".into()
}

fn default_link_prefix() -> String {
    "vente-".into()
}

fn default_block_marker() -> String {
    r#"<li class="products__item">"#.into()
}

fn default_item_selector() -> String {
    "li.products__item".into()
}

fn default_price() -> f64 {
    45.0
}

fn default_fetch_delay_ms() -> u64 {
    800
}

/// Prices must be finite and non-negative.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = serde_json::from_str(content)?;

    if let StoreConfig::Rest { api_key, .. } = &mut config.store {
        if api_key.is_empty() {
            *api_key = env::var(API_KEY_ENV).unwrap_or_default();
        }
    }

    if !is_valid_price(config.default_price) {
        return Err(ConfigError::Invalid(format!(
            "default_price must be a non-negative number, got {}",
            config.default_price
        )));
    }

    Ok(config)
}
