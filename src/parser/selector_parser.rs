// DOM-based card extraction; same contract as the marker parser, for pages where
// the card markup is not a single stable opening tag.
use crate::model::{ParserError, RawLink};
use crate::parser::EntryExtractor;
use scraper::{Html, Selector};

pub struct SelectorParser {
    item_selector: Selector,
}

impl SelectorParser {
    pub fn new(item_selector: &str) -> Result<Self, ParserError> {
        let item_selector = Selector::parse(item_selector)
            .map_err(|e| ParserError::InvalidSelector(format!("{}: {}", item_selector, e)))?;
        Ok(Self { item_selector })
    }
}

impl EntryExtractor for SelectorParser {
    /// Eager: the parsed document does not outlive this call, so all cards are
    /// collected before the iterator is returned.
    fn extract<'a>(&'a self, html: &'a str) -> Box<dyn Iterator<Item = RawLink> + 'a> {
        let document = Html::parse_document(html);
        let href_selector = Selector::parse("[href]").unwrap();
        let img_selector = Selector::parse("img[src]").unwrap();

        let mut links = Vec::new();

        for card in document.select(&self.item_selector) {
            let href = card
                .select(&href_selector)
                .next()
                .and_then(|node| node.value().attr("href"));
            let src = card
                .select(&img_selector)
                .next()
                .and_then(|node| node.value().attr("src"));

            if let (Some(href), Some(src)) = (href, src) {
                links.push(RawLink {
                    href: href.to_string(),
                    src: src.to_string(),
                });
            }
        }

        Box::new(links.into_iter())
    }
}
