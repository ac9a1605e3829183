// src/source/types.rs
use anyhow::Result;

/// Where the newest bulletin image lives.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub source: String, // e.g. "page", "rss"
    pub url: String,
    pub post_url: Option<String>,
    pub published_at: Option<u64>, // unix seconds, when the feed says so
}

#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn latest_image(&self) -> Result<ImageRef>;
    fn name(&self) -> &'static str;
}
