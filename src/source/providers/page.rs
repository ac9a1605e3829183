use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use regex::Regex;

use crate::source::types::{ImageRef, ImageSource};
use crate::source::{clean_image_url, og_image, DEFAULT_IMAGE_PATTERN, USER_AGENT};

/// Scrapes the public page HTML for the bulletin image.
pub struct PageImageSource {
    mode: Mode,
    image_re: Regex,
}

enum Mode {
    // Own copy so tests can hand in any &str.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl PageImageSource {
    /// `pattern` must have a capture group 1 holding the image URL.
    pub fn from_url(url: impl Into<String>, pattern: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building page http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
            image_re: compile_pattern(pattern)?,
        })
    }

    pub fn from_fixture_str(html: &str, pattern: Option<&str>) -> Result<Self> {
        Ok(Self {
            mode: Mode::Fixture(html.to_string()),
            image_re: compile_pattern(pattern)?,
        })
    }

    fn extract(&self, html: &str, page_url: Option<&str>) -> Result<ImageRef> {
        let url = self
            .image_re
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| clean_image_url(m.as_str()))
            .or_else(|| og_image(html))
            .ok_or_else(|| anyhow!("no bulletin image found on page"))?;
        let url = match page_url {
            Some(base) => absolutize(&url, base),
            None => url,
        };

        Ok(ImageRef {
            source: "page".to_string(),
            url,
            post_url: page_url.map(str::to_string),
            published_at: None,
        })
    }
}

// Relative `src` attributes are resolved against the page they came from.
fn absolutize(url: &str, base: &str) -> String {
    match reqwest::Url::parse(base).and_then(|b| b.join(url)) {
        Ok(u) => u.to_string(),
        Err(_) => url.to_string(),
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Regex> {
    let p = pattern.unwrap_or(DEFAULT_IMAGE_PATTERN);
    let re = Regex::new(p).map_err(|e| anyhow!("image pattern regex error: {e}"))?;
    if re.captures_len() < 2 {
        bail!("image pattern `{p}` needs a capture group for the URL");
    }
    Ok(re)
}

#[async_trait]
impl ImageSource for PageImageSource {
    async fn latest_image(&self) -> Result<ImageRef> {
        match &self.mode {
            Mode::Fixture(html) => self.extract(html, None),
            Mode::Http { url, client } => {
                let body = match client.get(url.as_str()).send().await {
                    Ok(resp) => resp
                        .error_for_status()
                        .context("page http status")?
                        .text()
                        .await
                        .context("page http .text()")?,
                    Err(e) => {
                        tracing::warn!(error = ?e, source = "page", "feed http error");
                        counter!("relay_feed_errors_total").increment(1);
                        return Err(e).context("page http get()");
                    }
                };
                self.extract(&body, Some(url))
            }
        }
    }

    fn name(&self) -> &'static str {
        "page"
    }
}
