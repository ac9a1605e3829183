//! Bounded list of recently published notice ids (the dedup key store).
//!
//! Most recent first, capped at `window` entries (default 10). Recording an id
//! that is already present moves it to the front instead of duplicating it.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_HISTORY_PATH: &str = "state/history.json";

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool>;
    async fn record(&self, id: &str) -> Result<()>;
    async fn recent(&self) -> Result<Vec<String>>;
}

/// On-disk shape, also the in-memory model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentIds {
    pub recent: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecentIds {
    pub fn contains(&self, id: &str) -> bool {
        self.recent.iter().any(|r| r == id)
    }

    pub fn push_front(&mut self, id: &str, window: usize, now: DateTime<Utc>) {
        self.recent.retain(|r| r != id);
        self.recent.insert(0, id.to_string());
        self.recent.truncate(window.max(1));
        self.updated_at = Some(now);
    }
}

#[derive(Debug)]
pub struct MemoryHistory {
    inner: Mutex<RecentIds>,
    window: usize,
}

impl MemoryHistory {
    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Mutex::new(RecentIds::default()),
            window: window.max(1),
        }
    }

    pub fn seeded(window: usize, ids: &[&str]) -> Self {
        let window = window.max(1);
        let recent = ids.iter().take(window).map(|s| s.to_string()).collect();
        Self {
            inner: Mutex::new(RecentIds {
                recent,
                updated_at: None,
            }),
            window,
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, RecentIds>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("history mutex poisoned"))
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_window(DEFAULT_HISTORY_WINDOW)
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.guard()?.contains(id))
    }

    async fn record(&self, id: &str) -> Result<()> {
        self.guard()?.push_front(id, self.window, Utc::now());
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<String>> {
        Ok(self.guard()?.recent.clone())
    }
}

/// JSON file store. A missing file is an empty history; a corrupt one is an error.
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
    window: usize,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>, window: usize) -> Self {
        Self {
            path: path.into(),
            window: window.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<RecentIds> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(RecentIds::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing history at {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RecentIds::default()),
            Err(e) => Err(e).with_context(|| format!("reading history at {}", self.path.display())),
        }
    }

    async fn write(&self, ids: &RecentIds) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(ids).context("serializing history")?;
        // write-then-rename
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryStore for FileHistory {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read().await?.contains(id))
    }

    async fn record(&self, id: &str) -> Result<()> {
        let mut ids = self.read().await?;
        ids.push_front(id, self.window, Utc::now());
        self.write(&ids).await
    }

    async fn recent(&self) -> Result<Vec<String>> {
        Ok(self.read().await?.recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_front_caps_and_moves() {
        let mut ids = RecentIds::default();
        let now = Utc::now();
        for i in 0..12 {
            ids.push_front(&format!("id-{i}"), 10, now);
        }
        assert_eq!(ids.recent.len(), 10);
        assert_eq!(ids.recent[0], "id-11");
        assert_eq!(ids.recent[9], "id-2");

        ids.push_front("id-5", 10, now);
        assert_eq!(ids.recent[0], "id-5");
        assert_eq!(ids.recent.len(), 10);
        assert_eq!(ids.recent.iter().filter(|r| *r == "id-5").count(), 1);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let h = MemoryHistory::seeded(3, &["a", "b"]);
        assert!(h.contains("a").await.unwrap());
        assert!(!h.contains("c").await.unwrap());
        h.record("c").await.unwrap();
        h.record("d").await.unwrap();
        assert_eq!(h.recent().await.unwrap(), vec!["d", "c", "a"]);
    }

    #[tokio::test]
    async fn file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("history.json");

        let h = FileHistory::new(&path, 2);
        assert!(h.recent().await.unwrap().is_empty());
        h.record("15-de-marzo-de-2024-matutino").await.unwrap();
        h.record("15-de-marzo-de-2024-vespertino").await.unwrap();
        h.record("16-de-marzo-de-2024-matutino").await.unwrap();

        let reopened = FileHistory::new(&path, 2);
        assert_eq!(
            reopened.recent().await.unwrap(),
            vec![
                "16-de-marzo-de-2024-matutino",
                "15-de-marzo-de-2024-vespertino"
            ]
        );
        assert!(!reopened
            .contains("15-de-marzo-de-2024-matutino")
            .await
            .unwrap());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let h = FileHistory::new(&path, 10);
        assert!(h.contains("x").await.is_err());
        assert!(h.record("x").await.is_err());
    }
}
