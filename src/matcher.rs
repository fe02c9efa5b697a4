// Matches a canonical product name against the scraped catalog.
// Tiers run in order; inside a tier the first entry in catalog insertion order
// wins, so a short key like "... n 1" can claim a name meant for "... n 16".
use crate::catalog::ScrapedCatalog;
use crate::model::{MatchResult, MatchType, ScrapedEntry};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CATALOG_CODE_RE: Regex = Regex::new(r"(?i)N°\s*([0-9]+)").unwrap();
}

pub fn find_best_image(product_name: &str, catalog: &ScrapedCatalog) -> Option<MatchResult> {
    match_exactish(product_name, catalog)
        .or_else(|| match_catalog_code(product_name, catalog))
        .or_else(|| match_normalized_text(product_name, catalog))
}

/// Digits following `N°` in a canonical name, if any.
pub fn catalog_code(product_name: &str) -> Option<&str> {
    CATALOG_CODE_RE
        .captures(product_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn found(match_type: MatchType, entry: &ScrapedEntry) -> MatchResult {
    MatchResult {
        match_type,
        key: entry.key.clone(),
        url: entry.image_url.clone(),
    }
}

fn match_exactish(product_name: &str, catalog: &ScrapedCatalog) -> Option<MatchResult> {
    let name = product_name.to_lowercase();
    catalog
        .iter()
        .find(|e| e.key == name || e.key.contains(&name) || name.contains(&e.key))
        .map(|e| found(MatchType::Exact, e))
}

fn match_catalog_code(product_name: &str, catalog: &ScrapedCatalog) -> Option<MatchResult> {
    let num = catalog_code(product_name)?;

    let spaced = format!("n {}", num);
    let joined = format!("n{}", num);
    let trailing = format!(" {}", num);
    let by_key = catalog.iter().find(|e| {
        e.key.contains(&spaced) || e.key.contains(&joined) || e.key.ends_with(&trailing)
    });
    if let Some(entry) = by_key {
        return Some(found(MatchType::Number, entry));
    }

    // Some filenames carry the code even though the cleaned key lost it.
    let underscored = format!("_{}_", num);
    let dashed = format!("-{}.", num);
    let joined_dash = format!("n{}-", num);
    let jpg = format!("{}.jpg", num);
    catalog
        .iter()
        .find(|e| {
            let url = e.image_url.to_lowercase();
            url.contains(&joined)
                || url.contains(&underscored)
                || url.contains(&dashed)
                || url.contains(&joined_dash)
                || url.ends_with(&jpg)
        })
        .map(|e| found(MatchType::Number, e))
}

fn alnum_lower(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

fn match_normalized_text(product_name: &str, catalog: &ScrapedCatalog) -> Option<MatchResult> {
    let name = alnum_lower(product_name);
    catalog
        .iter()
        .find(|e| {
            let key = alnum_lower(&e.key);
            key.contains(&name) || name.contains(&key)
        })
        .map(|e| found(MatchType::Text, e))
}
