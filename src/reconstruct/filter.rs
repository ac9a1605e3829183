use super::{RawLine, Role};

/// Working line inside a reconstruction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub text: String,
    pub x_baseline: f32,
    /// `None` until the classifier has looked at it.
    pub role: Option<Role>,
}

impl ParsedLine {
    pub fn new(text: impl Into<String>, x_baseline: f32) -> Self {
        Self {
            text: text.into(),
            x_baseline,
            role: None,
        }
    }

    /// Empty body line used as a paragraph break ahead of a section heading.
    pub(crate) fn paragraph_break(x_baseline: f32) -> Self {
        Self {
            text: String::new(),
            x_baseline,
            role: Some(Role::BodyContent),
        }
    }
}

/// Keep lines above `threshold` (strict) with non-blank text, trimmed at the edges.
/// Order is preserved; interior whitespace is left alone.
pub fn filter_lines(raw: &[RawLine], threshold: f32) -> Vec<ParsedLine> {
    raw.iter()
        .filter(|l| l.confidence > threshold)
        .filter_map(|l| {
            let text = l.text.trim();
            if text.is_empty() {
                None
            } else {
                Some(ParsedLine::new(text, l.baseline_x))
            }
        })
        .collect()
}
