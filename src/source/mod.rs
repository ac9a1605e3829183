// src/source/mod.rs
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use types::{ImageRef, ImageSource};

/// Matches the first `<img src="...">`; group 1 is the URL.
pub const DEFAULT_IMAGE_PATTERN: &str = r#"(?is)<img[^>]+src="([^"]+)""#;

pub(crate) const USER_AGENT: &str = concat!("outage-relay/", env!("CARGO_PKG_VERSION"));

/// `og:image` meta tag, used when the configured pattern finds nothing.
pub(crate) fn og_image(html: &str) -> Option<String> {
    static RE_OG: OnceCell<Regex> = OnceCell::new();
    let re = RE_OG.get_or_init(|| {
        Regex::new(r#"(?is)<meta[^>]+property="og:image"[^>]+content="([^"]+)""#).unwrap()
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| clean_image_url(m.as_str()))
}

/// Decode HTML entities (`&amp;` is everywhere in CDN query strings) and make
/// protocol-relative URLs absolute.
pub fn clean_image_url(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw.trim()).to_string();
    if let Some(rest) = decoded.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        decoded
    }
}
