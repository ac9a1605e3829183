// src/config/relay.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::{DEFAULT_HISTORY_PATH, DEFAULT_HISTORY_WINDOW};
use crate::reconstruct::ReconstructConfig;

pub const DEFAULT_RELAY_CONFIG_PATH: &str = "config/relay.toml";
pub const ENV_RELAY_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";

pub const ENV_CONFIDENCE_THRESHOLD: &str = "RELAY_CONFIDENCE_THRESHOLD";
pub const ENV_BASELINE_VARIANCE: &str = "RELAY_BASELINE_VARIANCE";
pub const ENV_SOURCE_URL: &str = "RELAY_SOURCE_URL";
pub const ENV_HISTORY_PATH: &str = "RELAY_HISTORY_PATH";
pub const ENV_DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub reconstruct: ReconstructConfig,
    pub source: SourceConfig,
    pub fetch: FetchConfig,
    pub ocr: OcrConfig,
    pub history: HistoryConfig,
    pub publish: PublishConfig,
    pub pipeline: PipelineConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Page,
    Rss,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: String,
    /// Regex with capture group 1 = image URL (page sources only).
    pub image_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("state/images"),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    #[default]
    Tesseract,
    Recorded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngine,
    pub binary: PathBuf,
    pub lang: String,
    pub psm: Option<u8>,
    /// OCR page JSON replayed by the `recorded` engine.
    pub recorded_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngine::Tesseract,
            binary: PathBuf::from("tesseract"),
            lang: "spa".to_string(),
            psm: None,
            recorded_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_HISTORY_PATH),
            window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Telegram,
    Discord,
    Email,
    #[default]
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub channel: Channel,
    /// Usually left out of the file and set via DISCORD_WEBHOOK_URL.
    pub discord_webhook: Option<String>,
    pub telegram_api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Refuse to publish a bulletin whose date line was not recognized.
    pub require_date: bool,
    pub interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            require_date: true,
            interval_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// e.g. "0.0.0.0:9100"; unset = no HTTP listener.
    pub listen: Option<String>,
}

// parse optional float env; non-numbers and negatives are ignored
fn parse_float_env(key: &str, raw: Option<String>) -> Option<f32> {
    let raw = raw?;
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid numeric override");
            None
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RelayConfig = toml::from_str(s).context("parsing relay config")?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the config file and apply env overrides:
    /// 1) $RELAY_CONFIG_PATH (must exist)
    /// 2) config/relay.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_RELAY_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_RELAY_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_RELAY_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Some(t) =
            parse_float_env(ENV_CONFIDENCE_THRESHOLD, std::env::var(ENV_CONFIDENCE_THRESHOLD).ok())
        {
            self.reconstruct.confidence_threshold = t;
        }
        if let Some(v) =
            parse_float_env(ENV_BASELINE_VARIANCE, std::env::var(ENV_BASELINE_VARIANCE).ok())
        {
            self.reconstruct.baseline_variance = v;
        }
        if let Ok(url) = std::env::var(ENV_SOURCE_URL) {
            if !url.trim().is_empty() {
                self.source.url = url.trim().to_string();
            }
        }
        if let Ok(p) = std::env::var(ENV_HISTORY_PATH) {
            if !p.trim().is_empty() {
                self.history.path = PathBuf::from(p.trim());
            }
        }
        if let Ok(hook) = std::env::var(ENV_DISCORD_WEBHOOK) {
            if !hook.trim().is_empty() {
                self.publish.discord_webhook = Some(hook.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.reconstruct.validate()?;
        if self.history.window == 0 {
            bail!("history.window must be at least 1");
        }
        if self.pipeline.interval_secs == 0 {
            bail!("pipeline.interval_secs must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be at least 1");
        }
        if self.ocr.engine == OcrEngine::Recorded && self.ocr.recorded_path.is_none() {
            bail!("ocr.engine = \"recorded\" needs ocr.recorded_path");
        }
        Ok(())
    }
}
