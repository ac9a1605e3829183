// src/reconstruct/mod.rs
//! Notice reconstruction from per-line OCR output.
//!
//! Flow: confidence/blank filter → leading-noise trim → role classification →
//! baseline alignment gate → newline-joined body + `{date}-{turn}` identifier.
//!
//! Everything here is synchronous and I/O free; the async pipeline feeds it an
//! already materialized line list.

pub mod align;
pub mod classify;
pub mod document;
pub mod filter;

pub use align::{bullet_body, is_glyph_only, normalize_bullet, AlignmentGate, GateVerdict};
pub use classify::{LineClassifier, Role};
pub use document::{PassCounts, ReconstructedNotice, Reconstructor};
pub use filter::{filter_lines, ParsedLine};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

// --- defaults ---
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 30.0;
pub const DEFAULT_BASELINE_VARIANCE: f32 = 40.0;
pub const DEFAULT_DATE_CONNECTIVE: &str = "de";
pub const DEFAULT_TURN_MARKER: &str = "TURNO";
pub const DEFAULT_BULLET_GLYPHS: &str = "-»«“”";
pub const DEFAULT_MONTHS: [&str; 13] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "setiembre", // regional spelling, shows up in some bulletins
    "octubre",
    "noviembre",
    "diciembre",
];

/// One recognized line as handed over by the recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub text: String,
    pub confidence: f32,
    pub baseline_x: f32,
}

impl RawLine {
    pub fn new(text: impl Into<String>, confidence: f32, baseline_x: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            baseline_x,
        }
    }
}

/// Tunables for the reconstruction pass. Loaded from the `[reconstruct]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructConfig {
    /// Lines with confidence <= this are dropped (engine native scale).
    pub confidence_threshold: f32,
    /// Max horizontal distance (px) from a role's first baseline.
    pub baseline_variance: f32,
    /// Connective word between day, month and year ("15 de marzo de 2024").
    pub date_connective: String,
    pub months: Vec<String>,
    /// Literal that turns an uppercase heading into a turn label.
    pub turn_marker: String,
    /// Leading glyphs stripped from body lines before the "- " prefix.
    pub bullet_glyphs: String,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            baseline_variance: DEFAULT_BASELINE_VARIANCE,
            date_connective: DEFAULT_DATE_CONNECTIVE.to_string(),
            months: DEFAULT_MONTHS.iter().map(|m| m.to_string()).collect(),
            turn_marker: DEFAULT_TURN_MARKER.to_string(),
            bullet_glyphs: DEFAULT_BULLET_GLYPHS.to_string(),
        }
    }
}

impl ReconstructConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            bail!(
                "reconstruct.confidence_threshold must be a finite, non-negative number (got {})",
                self.confidence_threshold
            );
        }
        if !self.baseline_variance.is_finite() || self.baseline_variance <= 0.0 {
            bail!(
                "reconstruct.baseline_variance must be a finite, positive number (got {})",
                self.baseline_variance
            );
        }
        if self.months.iter().all(|m| m.trim().is_empty()) {
            bail!("reconstruct.months must list at least one month name");
        }
        if self.date_connective.trim().is_empty() {
            bail!("reconstruct.date_connective must not be empty");
        }
        if self.turn_marker.trim().is_empty() {
            bail!("reconstruct.turn_marker must not be empty");
        }
        Ok(())
    }
}

/// Collapse every run of non-alphanumeric characters into a single `-`.
pub(crate) fn hyphenate(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_gap = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.push(c);
            in_gap = false;
        } else if !in_gap {
            out.push('-');
            in_gap = true;
        }
    }
    out
}
