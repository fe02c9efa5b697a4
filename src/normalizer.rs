// Turns scraped hrefs into catalog keys and scraped image paths into absolute URLs
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Page/variant id plus whatever follows it on the line.
    static ref DETAIL_SUFFIX_RE: Regex = Regex::new(r"_[0-9]+\.html.*").unwrap();
}

pub struct KeyNormalizer {
    link_prefix: String,
}

impl KeyNormalizer {
    pub fn new(link_prefix: impl Into<String>) -> Self {
        Self {
            link_prefix: link_prefix.into(),
        }
    }

    /// `vente-soft-green-n-22_1.html` -> `soft green n 22`. Case is left alone.
    pub fn normalize(&self, href: &str) -> String {
        let without_prefix = if self.link_prefix.is_empty() {
            href.to_string()
        } else {
            href.replacen(&self.link_prefix, "", 1)
        };
        DETAIL_SUFFIX_RE
            .replace(&without_prefix, "")
            .replace('-', " ")
    }
}

pub struct UrlResolver {
    site_root: String,
    locale_hop: String,
}

impl UrlResolver {
    pub fn new(site_root: impl Into<String>, locale: &str) -> Self {
        Self {
            site_root: site_root.into(),
            locale_hop: format!("/{}/..", locale),
        }
    }

    /// Best effort, never fails: relative paths are appended to the site root and
    /// the first `/<locale>/..` hop is collapsed.
    pub fn resolve(&self, src: &str) -> String {
        let absolute = if src.starts_with("http") {
            src.to_string()
        } else {
            format!("{}{}", self.site_root, src)
        };
        self.collapse(&absolute)
    }

    fn collapse(&self, url: &str) -> String {
        url.replacen(&self.locale_hop, "", 1)
    }
}
