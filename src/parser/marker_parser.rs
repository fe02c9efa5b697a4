// Splits a listing page on the product card marker and pattern-searches each card.
use crate::model::RawLink;
use crate::parser::EntryExtractor;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HREF_RE: Regex = Regex::new(r#"href="([^"]+)""#).unwrap();
    static ref IMG_SRC_RE: Regex = Regex::new(r#"img src="([^"]+)""#).unwrap();
}

pub struct MarkerParser {
    marker: String,
}

impl MarkerParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    fn parse_block(block: &str) -> Option<RawLink> {
        let href = HREF_RE.captures(block)?.get(1)?.as_str();
        let src = IMG_SRC_RE.captures(block)?.get(1)?.as_str();
        Some(RawLink {
            href: href.to_string(),
            src: src.to_string(),
        })
    }
}

impl EntryExtractor for MarkerParser {
    fn extract<'a>(&'a self, html: &'a str) -> Box<dyn Iterator<Item = RawLink> + 'a> {
        if self.marker.is_empty() {
            return Box::new(std::iter::empty());
        }
        // Whatever precedes the first card is page chrome.
        Box::new(html.split(self.marker.as_str()).skip(1).filter_map(Self::parse_block))
    }
}
