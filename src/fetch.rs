//! Image transfer: bring the referenced bulletin image onto local disk.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fingerprint::short_hash;
use crate::source::ImageRef;

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Returns the local path of the image.
    async fn fetch(&self, image: &ImageRef) -> Result<PathBuf>;
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    dir: PathBuf,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            dir: dir.into(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// `<dir>/<hash-of-url>.<ext>`; same URL, same file.
    pub fn target_path(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", short_hash(url), extension_of(url)))
    }
}

/// Local references (`file://...` or an existing path) need no transfer.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(p) = url.strip_prefix("file://") {
        return Some(PathBuf::from(p));
    }
    if url.contains("://") {
        return None;
    }
    let p = Path::new(url);
    p.exists().then(|| p.to_path_buf())
}

fn extension_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext))
            if (2..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "jpg".to_string(),
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image: &ImageRef) -> Result<PathBuf> {
        if let Some(p) = local_path(&image.url) {
            if !tokio::fs::try_exists(&p).await.unwrap_or(false) {
                bail!("local image {} does not exist", p.display());
            }
            return Ok(p);
        }

        let bytes = self
            .client
            .get(&image.url)
            .timeout(self.timeout)
            .send()
            .await
            .context("image http get()")?
            .error_for_status()
            .context("image http status")?
            .bytes()
            .await
            .context("image http body")?;
        if bytes.is_empty() {
            bail!("image download returned an empty body");
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let target = self.target_path(&image.url);
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        tracing::debug!(target: "fetch", path = %target.display(), bytes = bytes.len(), "image stored");
        Ok(target)
    }
}
