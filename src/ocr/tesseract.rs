//! `tesseract` CLI bridge. Runs the engine with TSV output and regroups word
//! rows into paragraphs and lines.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{Baseline, OcrLine, OcrPage, OcrParagraph, Recognizer};

#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    lang: String,
    psm: Option<u8>,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            lang: "spa".to_string(),
            psm: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_psm(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, image: &Path) -> Result<OcrPage> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image).arg("stdout").arg("-l").arg(&self.lang);
        if let Some(psm) = self.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd.arg("tsv");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to invoke {}", self.binary.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tesseract failed ({}): {}", output.status, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_tsv(&stdout)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

#[derive(Debug)]
struct LineAcc {
    key: (u32, u32, u32),
    words: Vec<String>,
    conf_sum: f32,
    conf_n: u32,
    left: f32,
}

impl LineAcc {
    fn into_line(self) -> OcrLine {
        let confidence = if self.conf_n == 0 {
            0.0
        } else {
            self.conf_sum / self.conf_n as f32
        };
        OcrLine {
            text: self.words.join(" "),
            confidence,
            baseline: Baseline { x0: self.left },
        }
    }
}

/// Parse `tesseract ... tsv` output. Only word rows (level 5) are used; a line
/// is keyed by (block, paragraph, line). Confidence is the mean word
/// confidence, `-1` entries ignored; baseline x0 is the leftmost word edge.
pub fn parse_tsv(tsv: &str) -> Result<OcrPage> {
    let mut rows = tsv.lines();
    let header = rows.next().ok_or_else(|| anyhow!("empty tesseract output"))?;
    let cols: Vec<&str> = header.split('\t').collect();
    let idx = |name: &str| {
        cols.iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| anyhow!("tesseract tsv missing column `{name}`"))
    };
    let i_level = idx("level")?;
    let i_block = idx("block_num")?;
    let i_par = idx("par_num")?;
    let i_line = idx("line_num")?;
    let i_left = idx("left")?;
    let i_conf = idx("conf")?;
    let i_text = idx("text")?;

    let mut page = OcrPage::default();
    let mut current: Option<LineAcc> = None;
    let mut last_para: Option<(u32, u32)> = None;

    for (n, row) in rows.enumerate() {
        if row.trim().is_empty() {
            continue;
        }
        let f: Vec<&str> = row.split('\t').collect();
        let field = |i: usize| f.get(i).copied().unwrap_or("");
        let num = |i: usize| -> Result<f32> {
            field(i)
                .trim()
                .parse::<f32>()
                .with_context(|| format!("tsv row {}: bad number in column {i}", n + 2))
        };

        if num(i_level)? as u32 != 5 {
            continue;
        }
        let text = field(i_text).trim();
        if text.is_empty() {
            continue;
        }
        let key = (num(i_block)? as u32, num(i_par)? as u32, num(i_line)? as u32);
        let left = num(i_left)?;
        let conf = num(i_conf)?;

        let same_line = current.as_ref().is_some_and(|c| c.key == key);
        if !same_line {
            if let Some(done) = current.take() {
                push_line(&mut page, &mut last_para, done);
            }
            current = Some(LineAcc {
                key,
                words: Vec::new(),
                conf_sum: 0.0,
                conf_n: 0,
                left,
            });
        }
        if let Some(acc) = current.as_mut() {
            acc.words.push(text.to_string());
            acc.left = acc.left.min(left);
            if conf >= 0.0 {
                acc.conf_sum += conf;
                acc.conf_n += 1;
            }
        }
    }
    if let Some(done) = current.take() {
        push_line(&mut page, &mut last_para, done);
    }

    Ok(page)
}

// Opens a new paragraph whenever (block, par) changes.
fn push_line(page: &mut OcrPage, last_para: &mut Option<(u32, u32)>, acc: LineAcc) {
    let para_key = (acc.key.0, acc.key.1);
    if *last_para != Some(para_key) {
        page.paragraphs.push(OcrParagraph::default());
        *last_para = Some(para_key);
    }
    if let Some(p) = page.paragraphs.last_mut() {
        p.lines.push(acc.into_line());
    }
}
