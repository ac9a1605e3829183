// src/ocr/mod.rs
pub mod recorded;
pub mod tesseract;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::reconstruct::RawLine;

/// Recognizer output: paragraphs of lines, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub paragraphs: Vec<OcrParagraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrParagraph {
    pub lines: Vec<OcrLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
    pub baseline: Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub x0: f32,
}

impl OcrPage {
    /// Decode a recorded recognizer payload. Missing fields or non-finite
    /// numbers are a contract violation, not noisy data.
    pub fn from_json(s: &str) -> Result<Self> {
        let page: OcrPage = serde_json::from_str(s).context("decoding OCR page JSON")?;
        page.validate()?;
        Ok(page)
    }

    pub fn validate(&self) -> Result<()> {
        for (p, para) in self.paragraphs.iter().enumerate() {
            for (l, line) in para.lines.iter().enumerate() {
                if !line.confidence.is_finite() || !line.baseline.x0.is_finite() {
                    bail!("OCR line {p}.{l} has a non-finite confidence or baseline");
                }
            }
        }
        Ok(())
    }

    /// Flatten paragraphs into one ordered line list.
    pub fn to_raw_lines(&self) -> Vec<RawLine> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.lines.iter())
            .map(|l| RawLine::new(l.text.clone(), l.confidence, l.baseline.x0))
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.lines.len()).sum()
    }
}

#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<OcrPage>;
    fn name(&self) -> &'static str;
}
