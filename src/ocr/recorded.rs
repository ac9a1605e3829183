// src/ocr/recorded.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{OcrPage, Recognizer};

/// Replays a previously captured recognizer payload instead of running an
/// engine. Handy for offline runs and for pinning a bulletin in tests.
pub struct RecordedRecognizer {
    mode: Mode,
}

enum Mode {
    File(PathBuf),
    Page(OcrPage),
}

impl RecordedRecognizer {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::File(path.into()),
        }
    }

    pub fn from_page(page: OcrPage) -> Self {
        Self {
            mode: Mode::Page(page),
        }
    }
}

/// Load an [`OcrPage`] JSON file.
pub async fn load_page(path: &Path) -> Result<OcrPage> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading OCR payload from {}", path.display()))?;
    OcrPage::from_json(&body).with_context(|| format!("in {}", path.display()))
}

#[async_trait]
impl Recognizer for RecordedRecognizer {
    async fn recognize(&self, _image: &Path) -> Result<OcrPage> {
        match &self.mode {
            Mode::File(p) => load_page(p).await,
            Mode::Page(page) => Ok(page.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "recorded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Baseline, OcrLine, OcrParagraph};

    #[tokio::test]
    async fn replays_file_and_page() {
        let page = OcrPage {
            paragraphs: vec![OcrParagraph {
                lines: vec![OcrLine {
                    text: "15 de marzo de 2024".into(),
                    confidence: 90.0,
                    baseline: Baseline { x0: 10.0 },
                }],
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("page.json");
        std::fs::write(&p, serde_json::to_string(&page).unwrap()).unwrap();

        let from_file = RecordedRecognizer::from_path(&p)
            .recognize(Path::new("ignored.jpg"))
            .await
            .unwrap();
        assert_eq!(from_file, page);

        let in_mem = RecordedRecognizer::from_page(page.clone())
            .recognize(Path::new("ignored.jpg"))
            .await
            .unwrap();
        assert_eq!(in_mem, page);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let r = RecordedRecognizer::from_path("/definitely/not/here.json");
        assert!(r.recognize(Path::new("x.jpg")).await.is_err());
    }
}
