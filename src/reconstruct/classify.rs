// src/reconstruct/classify.rs
//! Structural role of a single OCR line, decided from its text alone.
//!
//! Precedence: Date → SectionHeading (→ TurnLabel when it carries the marker) → BodyContent.

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ReconstructConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    SectionHeading,
    TurnLabel,
    BodyContent,
}

#[derive(Debug, Clone)]
pub struct LineClassifier {
    date_re: Regex,
    turn_marker: String,
}

impl LineClassifier {
    pub fn from_config(cfg: &ReconstructConfig) -> Result<Self> {
        let months = cfg
            .months
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let conn = regex::escape(cfg.date_connective.trim());
        let pattern = format!(r"(?i)\b\d{{1,2}}\s+{conn}\s+(?:{months})\s+{conn}\s+\d{{4}}\b");
        let date_re =
            Regex::new(&pattern).map_err(|e| anyhow!("date pattern `{pattern}` regex error: {e}"))?;

        Ok(Self {
            date_re,
            turn_marker: cfg.turn_marker.trim().to_uppercase(),
        })
    }

    pub fn classify(&self, text: &str) -> Role {
        if self.date_re.is_match(text) {
            return Role::Date;
        }
        if is_heading(text) {
            if text.contains(self.turn_marker.as_str()) {
                return Role::TurnLabel;
            }
            return Role::SectionHeading;
        }
        Role::BodyContent
    }

    /// The matched date phrase inside `text`, if any.
    pub fn find_date<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.date_re.find(text).map(|m| m.as_str())
    }

    pub fn is_date(&self, text: &str) -> bool {
        self.date_re.is_match(text)
    }

    pub fn turn_marker(&self) -> &str {
        &self.turn_marker
    }
}

/// Uppercase letters, hyphens and whitespace only, with at least one letter.
fn is_heading(text: &str) -> bool {
    static RE_HEADING: OnceCell<Regex> = OnceCell::new();
    let re = RE_HEADING.get_or_init(|| Regex::new(r"^[\p{Lu}\s-]+$").unwrap());
    re.is_match(text) && text.chars().any(|c| c.is_uppercase())
}
