// Product card extraction from catalog listing pages

pub mod marker_parser;
pub mod selector_parser;

pub use marker_parser::MarkerParser;
pub use selector_parser::SelectorParser;

use crate::config::{ExtractorKind, SiteConfig};
use crate::model::{ParserError, RawLink};

/// Pulls one `(href, src)` pair per product card out of a listing page, in document order.
/// Cards missing either attribute are skipped. Implementations may yield lazily
/// or collect up front.
pub trait EntryExtractor {
    fn extract<'a>(&'a self, html: &'a str) -> Box<dyn Iterator<Item = RawLink> + 'a>;
}

pub fn build_extractor(site: &SiteConfig) -> Result<Box<dyn EntryExtractor>, ParserError> {
    Ok(match site.extractor {
        ExtractorKind::Marker => Box::new(MarkerParser::new(site.block_marker.clone())),
        ExtractorKind::Selector => Box::new(SelectorParser::new(&site.item_selector)?),
    })
}
