//! Baseline alignment gate.
//!
//! Stray OCR lines (ads, captions) often pass the textual checks but sit in a
//! different visual column. Each gated role remembers the baseline of its first
//! accepted line; later lines of that role must stay within `variance` of it.

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Accept,
    Reject,
}

/// Per-document alignment state. Create one per reconstruction pass.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentGate {
    variance: f32,
    first_bullet_baseline: Option<f32>,
    first_heading_baseline: Option<f32>,
}

impl AlignmentGate {
    pub fn new(variance: f32) -> Self {
        Self {
            variance,
            first_bullet_baseline: None,
            first_heading_baseline: None,
        }
    }

    /// Body content line.
    pub fn admit_bullet(&mut self, x: f32) -> GateVerdict {
        Self::admit(&mut self.first_bullet_baseline, x, self.variance)
    }

    /// Section heading (turn labels never come through here).
    pub fn admit_heading(&mut self, x: f32) -> GateVerdict {
        Self::admit(&mut self.first_heading_baseline, x, self.variance)
    }

    pub fn bullet_reference(&self) -> Option<f32> {
        self.first_bullet_baseline
    }

    pub fn heading_reference(&self) -> Option<f32> {
        self.first_heading_baseline
    }

    fn admit(reference: &mut Option<f32>, x: f32, variance: f32) -> GateVerdict {
        match *reference {
            None => {
                *reference = Some(x);
                GateVerdict::Accept
            }
            Some(r) if (x - r).abs() < variance => GateVerdict::Accept,
            Some(_) => GateVerdict::Reject,
        }
    }
}

/// Body text with at most one leading glyph from `glyphs` and at most one
/// space after it removed. Only the first glyph is consumed: `"» » x"` keeps
/// its second `»`.
pub fn bullet_body<'t>(text: &'t str, glyphs: &str) -> &'t str {
    match text.chars().next() {
        Some(c) if glyphs.contains(c) => {
            let rest = &text[c.len_utf8()..];
            rest.strip_prefix(' ').unwrap_or(rest)
        }
        _ => text,
    }
}

/// Rewrite a body line to `- text` via [`bullet_body`].
pub fn normalize_bullet(text: &str, glyphs: &str) -> String {
    format!("- {}", bullet_body(text, glyphs))
}

/// Lines made only of bullet glyphs and whitespace (stray `-`, `»`) carry no content.
pub fn is_glyph_only(text: &str, glyphs: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || glyphs.contains(c))
}
