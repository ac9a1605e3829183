//! Document reconstruction: the single forward pass that turns filtered OCR
//! lines into `{id, text}`.
//!
//! Each input line maps to exactly one [`Step`]; applying a step appends zero,
//! one or two lines to a fresh output sequence. Paragraph breaks ahead of
//! headings are an explicit step instead of an in-place insertion.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::align::{is_glyph_only, normalize_bullet, AlignmentGate, GateVerdict};
use super::classify::{LineClassifier, Role};
use super::filter::{filter_lines, ParsedLine};
use super::{hyphenate, RawLine, ReconstructConfig};

/// Stand-in for the date part of the id when no date line was found.
pub const UNDEFINED_DATE: &str = "undefined";
/// Stand-in for the turn part of the id when no turn label was found.
pub const UNKNOWN_TURN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructedNotice {
    /// `{date}-{turn}`; the only dedup key.
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
}

impl ReconstructedNotice {
    pub fn has_date(&self) -> bool {
        self.date.is_some()
    }
}

/// Line accounting for one pass (feeds logs and metrics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub input: usize,
    /// Removed by the confidence/blank filter.
    pub filtered: usize,
    /// Noise above the first date line.
    pub trimmed: usize,
    /// Rejected by the alignment gate.
    pub misaligned: usize,
}

/// What a single classified line does to the pass.
#[derive(Debug)]
enum Step {
    /// Date or turn label: recorded for the id, not emitted.
    Consume,
    /// Glyph-only body line: nothing to emit, gate untouched.
    Skip,
    Emit(ParsedLine),
    /// Heading: emit a blank paragraph break first, then the heading.
    EmitWithBreak(ParsedLine),
    Drop,
}

#[derive(Debug)]
struct PassState {
    gate: AlignmentGate,
    date: Option<String>,
    turn: Option<String>,
    out: Vec<ParsedLine>,
    misaligned: usize,
}

impl PassState {
    fn new(variance: f32) -> Self {
        Self {
            gate: AlignmentGate::new(variance),
            date: None,
            turn: None,
            out: Vec::new(),
            misaligned: 0,
        }
    }

    fn apply(&mut self, step: Step) {
        match step {
            Step::Consume | Step::Skip => {}
            Step::Emit(line) => self.out.push(line),
            Step::EmitWithBreak(line) => {
                self.out.push(ParsedLine::paragraph_break(line.x_baseline));
                self.out.push(line);
            }
            Step::Drop => self.misaligned += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconstructor {
    cfg: ReconstructConfig,
    classifier: LineClassifier,
}

impl Reconstructor {
    pub fn new(cfg: ReconstructConfig) -> Result<Self> {
        cfg.validate()?;
        let classifier = LineClassifier::from_config(&cfg)?;
        Ok(Self { cfg, classifier })
    }

    pub fn reconstruct(&self, raw: &[RawLine]) -> ReconstructedNotice {
        self.reconstruct_counted(raw).0
    }

    pub fn reconstruct_counted(&self, raw: &[RawLine]) -> (ReconstructedNotice, PassCounts) {
        let lines = filter_lines(raw, self.cfg.confidence_threshold);
        let mut counts = PassCounts {
            input: raw.len(),
            filtered: raw.len() - lines.len(),
            ..Default::default()
        };

        // Nothing above the date line belongs to the notice.
        let start = lines
            .iter()
            .position(|l| self.classifier.is_date(&l.text))
            .unwrap_or(lines.len());
        counts.trimmed = start;

        let mut state = PassState::new(self.cfg.baseline_variance);
        for line in lines.into_iter().skip(start) {
            let step = self.step(&mut state, line);
            state.apply(step);
        }
        counts.misaligned = state.misaligned;

        let notice = finish(state);
        debug!(
            target: "reconstruct",
            id = %notice.id,
            input = counts.input,
            filtered = counts.filtered,
            trimmed = counts.trimmed,
            misaligned = counts.misaligned,
            "notice reconstructed"
        );
        (notice, counts)
    }

    fn step(&self, state: &mut PassState, mut line: ParsedLine) -> Step {
        let role = self.classifier.classify(&line.text);
        line.role = Some(role);

        match role {
            Role::Date => {
                if let Some(m) = self.classifier.find_date(&line.text) {
                    state.date = Some(hyphenate(m).to_lowercase());
                }
                Step::Consume
            }
            Role::TurnLabel => {
                let turn = self.normalize_turn(&line.text);
                if !turn.is_empty() {
                    state.turn = Some(turn);
                }
                Step::Consume
            }
            Role::SectionHeading => match state.gate.admit_heading(line.x_baseline) {
                GateVerdict::Accept => Step::EmitWithBreak(line),
                GateVerdict::Reject => {
                    debug!(target: "reconstruct", x = line.x_baseline, reference = ?state.gate.heading_reference(), "heading off column");
                    Step::Drop
                }
            },
            Role::BodyContent if is_glyph_only(&line.text, &self.cfg.bullet_glyphs) => Step::Skip,
            Role::BodyContent => match state.gate.admit_bullet(line.x_baseline) {
                GateVerdict::Accept => {
                    line.text = normalize_bullet(&line.text, &self.cfg.bullet_glyphs);
                    Step::Emit(line)
                }
                GateVerdict::Reject => {
                    debug!(target: "reconstruct", x = line.x_baseline, reference = ?state.gate.bullet_reference(), "body line off column");
                    Step::Drop
                }
            },
        }
    }

    /// "TURNO MATUTINO" → "matutino". Drops the marker (and one space after it),
    /// hyphenates what is left and lower-cases it.
    fn normalize_turn(&self, text: &str) -> String {
        let marker = self.classifier.turn_marker();
        let stripped = match text.find(marker) {
            Some(pos) => {
                let rest = &text[pos + marker.len()..];
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                format!("{}{}", &text[..pos], rest)
            }
            None => text.to_string(),
        };
        hyphenate(&stripped).trim_matches('-').to_lowercase()
    }
}

fn finish(state: PassState) -> ReconstructedNotice {
    let id = format!(
        "{}-{}",
        state.date.as_deref().unwrap_or(UNDEFINED_DATE),
        state.turn.as_deref().unwrap_or(UNKNOWN_TURN)
    );
    let text = state
        .out
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    ReconstructedNotice {
        id,
        text,
        date: state.date,
        turn: state.turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec() -> Reconstructor {
        Reconstructor::new(ReconstructConfig::default()).unwrap()
    }

    fn line(text: &str, x: f32) -> RawLine {
        RawLine::new(text, 90.0, x)
    }

    #[test]
    fn reference_example() {
        let raw = vec![
            line("15 de marzo de 2024", 10.0),
            line("TURNO MATUTINO", 12.0),
            line("- Colonia Centro", 15.0),
            line("anuncio publicitario", 400.0),
        ];
        let (n, counts) = rec().reconstruct_counted(&raw);
        assert_eq!(n.id, "15-de-marzo-de-2024-matutino");
        assert_eq!(n.text, "- Colonia Centro");
        assert_eq!(counts.misaligned, 1);
        assert_eq!(counts.trimmed, 0);
    }

    #[test]
    fn heading_gets_paragraph_break() {
        let raw = vec![
            line("15 de marzo de 2024", 10.0),
            line("Colonia Centro", 20.0),
            line("SECTOR NORTE", 50.0),
            line("Las Palmas", 22.0),
            line("SECTOR SUR", 60.0),
            line("El Mirador", 18.0),
        ];
        let n = rec().reconstruct(&raw);
        assert_eq!(
            n.text,
            "- Colonia Centro\n\nSECTOR NORTE\n- Las Palmas\n\nSECTOR SUR\n- El Mirador"
        );
        assert_eq!(n.id, "15-de-marzo-de-2024-unknown");
    }

    #[test]
    fn misaligned_heading_is_dropped_without_break() {
        let raw = vec![
            line("15 de marzo de 2024", 10.0),
            line("SECTOR NORTE", 50.0),
            line("Centro", 20.0),
            line("PUBLICIDAD", 500.0),
            line("Norte", 21.0),
        ];
        let n = rec().reconstruct(&raw);
        assert_eq!(n.text, "\nSECTOR NORTE\n- Centro\n- Norte");
    }

    #[test]
    fn turn_label_bypasses_gate() {
        let raw = vec![
            line("SECTOR", 10.0),
            line("15 de marzo de 2024", 10.0),
            line("COLONIAS", 10.0),
            line("TURNO VESPERTINO", 900.0),
            line("Centro", 10.0),
        ];
        let n = rec().reconstruct(&raw);
        assert_eq!(n.turn.as_deref(), Some("vespertino"));
        assert_eq!(n.text, "\nCOLONIAS\n- Centro");
    }

    #[test]
    fn turn_normalization() {
        let r = rec();
        assert_eq!(r.normalize_turn("TURNO MATUTINO"), "matutino");
        assert_eq!(r.normalize_turn("TURNO  VESPERTINO - NOCTURNO"), "vespertino-nocturno");
        assert_eq!(r.normalize_turn("PRIMER TURNO"), "primer");
        assert_eq!(r.normalize_turn("TURNO"), "");
    }

    #[test]
    fn bare_marker_counts_as_no_turn() {
        let raw = vec![line("1 de junio de 2025", 0.0), line("TURNO", 0.0)];
        assert_eq!(rec().reconstruct(&raw).id, "1-de-junio-de-2025-unknown");
    }

    #[test]
    fn date_is_taken_from_matched_phrase_only() {
        let raw = vec![line("Martes, 2 de julio de 2024.", 0.0)];
        let n = rec().reconstruct(&raw);
        assert_eq!(n.date.as_deref(), Some("2-de-julio-de-2024"));
        assert_eq!(n.text, "");
    }

    #[test]
    fn date_case_does_not_change_the_id() {
        let a = rec().reconstruct(&[line("15 de marzo de 2024", 0.0), line("TURNO MATUTINO", 0.0)]);
        let b = rec().reconstruct(&[line("15 de Marzo de 2024", 0.0), line("TURNO MATUTINO", 0.0)]);
        let c = rec().reconstruct(&[line("15 DE MARZO DE 2024", 0.0), line("TURNO MATUTINO", 0.0)]);
        assert_eq!(a.id, "15-de-marzo-de-2024-matutino");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, c.id);
    }

    #[test]
    fn glyph_only_lines_are_skipped() {
        let raw = vec![
            line("15 de marzo de 2024", 10.0),
            line("-", 300.0),
            line("Colonia Centro", 12.0),
            line("»", 14.0),
            line("Las Palmas", 13.0),
        ];
        let (n, counts) = rec().reconstruct_counted(&raw);
        // the stray dash neither becomes "- " nor claims the bullet column
        assert_eq!(n.text, "- Colonia Centro\n- Las Palmas");
        assert_eq!(counts.misaligned, 0);
    }

    #[test]
    fn empty_input() {
        let n = rec().reconstruct(&[]);
        assert_eq!(n.text, "");
        assert_eq!(n.id, "undefined-unknown");
        assert!(!n.has_date());
    }
}
