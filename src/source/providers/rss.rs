// src/source/providers/rss.rs
//! RSS feed provider (for pages mirrored through a feed bridge). Picks the
//! newest item that carries an image: enclosure first, then the first `<img>`
//! in the description.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::source::types::{ImageRef, ImageSource};
use crate::source::{clean_image_url, USER_AGENT};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: String,
    #[serde(rename = "@type", default)]
    kind: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn description_image(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re = RE_IMG.get_or_init(|| Regex::new(r#"(?is)<img[^>]+src="([^"]+)""#).unwrap());
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| clean_image_url(m.as_str()))
}

fn item_image(it: &Item) -> Option<String> {
    if let Some(enc) = &it.enclosure {
        let is_image = enc
            .kind
            .as_deref()
            .map(|k| k.starts_with("image/"))
            .unwrap_or(true);
        if is_image && !enc.url.trim().is_empty() {
            return Some(clean_image_url(&enc.url));
        }
    }
    it.description.as_deref().and_then(description_image)
}

pub struct RssImageSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssImageSource {
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_latest(s: &str) -> Result<ImageRef> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut items = rss.channel.item;
        // Feeds are usually newest-first already; only reorder when every item is dated.
        let dated: Option<Vec<u64>> = items
            .iter()
            .map(|it| it.pub_date.as_deref().and_then(parse_rfc2822_to_unix))
            .collect();
        if let Some(ts) = dated {
            let mut order: Vec<(u64, Item)> = ts.into_iter().zip(items).collect();
            order.sort_by(|a, b| b.0.cmp(&a.0));
            items = order.into_iter().map(|(_, it)| it).collect();
        }

        let total = items.len();
        let found = items
            .into_iter()
            .find_map(|it| item_image(&it).map(|url| (url, it)))
            .map(|(url, it)| ImageRef {
                source: "rss".to_string(),
                url,
                post_url: it.link,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            });

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("relay_feed_parse_ms").record(ms);
        found.ok_or_else(|| anyhow!("none of {total} feed items carries an image"))
    }
}

#[async_trait]
impl ImageSource for RssImageSource {
    async fn latest_image(&self) -> Result<ImageRef> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_latest(s),
            Mode::Http { url, client } => {
                let body = match client.get(url.as_str()).send().await {
                    Ok(resp) => resp
                        .error_for_status()
                        .context("rss http status")?
                        .text()
                        .await
                        .context("rss http .text()")?,
                    Err(e) => {
                        tracing::warn!(error = ?e, source = "rss", "feed http error");
                        counter!("relay_feed_errors_total").increment(1);
                        return Err(e).context("rss http get()");
                    }
                };
                Self::parse_latest(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&laquo;", "\"")
        .replace("&raquo;", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Organismo de Agua</title>
  <item>
    <title>Texto sin imagen</title>
    <link>https://social.example/posts/3</link>
    <pubDate>Fri, 15 Mar 2024 09:00:00 +0000</pubDate>
    <description>Recuerda cuidar el agua&nbsp;</description>
  </item>
  <item>
    <title>Aviso</title>
    <link>https://social.example/posts/2</link>
    <pubDate>Fri, 15 Mar 2024 07:30:00 +0000</pubDate>
    <description><![CDATA[<p>Aviso</p><img src="https://cdn.example/aviso.jpg?a=1&amp;b=2">]]></description>
  </item>
  <item>
    <title>Viejo</title>
    <link>https://social.example/posts/1</link>
    <pubDate>Thu, 14 Mar 2024 07:30:00 +0000</pubDate>
    <enclosure url="https://cdn.example/viejo.jpg" type="image/jpeg" length="0"/>
  </item>
</channel></rss>"#;

    #[tokio::test]
    async fn newest_item_with_image_wins() {
        let img = RssImageSource::from_fixture_str(FEED)
            .latest_image()
            .await
            .unwrap();
        assert_eq!(img.url, "https://cdn.example/aviso.jpg?a=1&b=2");
        assert_eq!(img.post_url.as_deref(), Some("https://social.example/posts/2"));
        assert_eq!(img.published_at, Some(1_710_487_800));
    }

    #[tokio::test]
    async fn enclosure_is_preferred() {
        let feed = r#"<rss><channel><item>
            <link>https://social.example/posts/9</link>
            <description><![CDATA[<img src="https://cdn.example/thumb.jpg">]]></description>
            <enclosure url="https://cdn.example/full.jpg" type="image/jpeg"/>
        </item></channel></rss>"#;
        let img = RssImageSource::from_fixture_str(feed)
            .latest_image()
            .await
            .unwrap();
        assert_eq!(img.url, "https://cdn.example/full.jpg");
        assert_eq!(img.published_at, None);
    }

    #[tokio::test]
    async fn feed_without_images_is_an_error() {
        let feed = "<rss><channel><item><title>x</title></item></channel></rss>";
        let err = RssImageSource::from_fixture_str(feed)
            .latest_image()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 feed items"));
    }

    #[tokio::test]
    async fn broken_xml_is_an_error() {
        assert!(RssImageSource::from_fixture_str("<rss><channel>")
            .latest_image()
            .await
            .is_err());
    }
}
