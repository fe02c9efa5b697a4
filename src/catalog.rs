// Scraped catalog: ordered key -> image URL mapping. Re-inserting a key replaces
// its URL but keeps the position where it was first seen.
use crate::model::{CatalogError, ScrapedEntry};
use crate::normalizer::{KeyNormalizer, UrlResolver};
use crate::parser::EntryExtractor;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedCatalog {
    entries: Vec<ScrapedEntry>,
    index: HashMap<String, usize>,
}

impl ScrapedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, image_url: String) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].image_url = image_url,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(ScrapedEntry { key, image_url });
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].image_url.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScrapedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl FromIterator<(String, String)> for ScrapedCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (key, url) in iter {
            catalog.insert(key, url);
        }
        catalog
    }
}

impl Serialize for ScrapedCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.image_url)?;
        }
        map.end()
    }
}

struct CatalogVisitor;

impl<'de> Visitor<'de> for CatalogVisitor {
    type Value = ScrapedCatalog;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of scraped keys to image URLs")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut catalog = ScrapedCatalog::new();
        while let Some((key, url)) = access.next_entry::<String, String>()? {
            catalog.insert(key, url);
        }
        Ok(catalog)
    }
}

impl<'de> Deserialize<'de> for ScrapedCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CatalogVisitor)
    }
}

/// Runs extractor -> normalizer -> resolver over one page.
pub fn entries_from_html<'a>(
    html: &'a str,
    extractor: &'a dyn EntryExtractor,
    normalizer: &'a KeyNormalizer,
    resolver: &'a UrlResolver,
) -> impl Iterator<Item = ScrapedEntry> + 'a {
    extractor.extract(html).map(move |link| ScrapedEntry {
        key: normalizer.normalize(&link.href),
        image_url: resolver.resolve(&link.src),
    })
}

/// Builds the catalog from page files in order. Missing or unreadable files are
/// logged and skipped.
pub fn build_catalog(
    pages: &[PathBuf],
    extractor: &dyn EntryExtractor,
    normalizer: &KeyNormalizer,
    resolver: &UrlResolver,
) -> ScrapedCatalog {
    let mut catalog = ScrapedCatalog::new();

    for page in pages {
        if !page.exists() {
            warn!("Page not found, skipping: {}", page.display());
            continue;
        }
        let html = match fs::read_to_string(page) {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to read {}: {}", page.display(), e);
                continue;
            }
        };

        let before = catalog.len();
        for entry in entries_from_html(&html, extractor, normalizer, resolver) {
            debug!("{} -> {}", entry.key, entry.image_url);
            catalog.insert(entry.key, entry.image_url);
        }
        info!(
            "Extracted {} new keys from {} ({} total)",
            catalog.len() - before,
            page.display(),
            catalog.len()
        );
    }

    catalog
}
