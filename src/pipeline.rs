// src/pipeline.rs
//! One relay run: feed → image → OCR → reconstruction → dedup → publish → record.
//!
//! Strictly sequential. Every stage maps its collaborator error onto one
//! [`RelayError`] variant so callers can tell "already published" apart from
//! real incidents.

use anyhow::{anyhow, Context, Result};
use metrics::{counter, gauge, histogram};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Channel, OcrEngine, RelayConfig, SourceKind};
use crate::error::RelayError;
use crate::fetch::{HttpImageFetcher, ImageFetcher};
use crate::fingerprint::short_hash;
use crate::history::{FileHistory, HistoryStore};
use crate::notify::discord::DiscordPublisher;
use crate::notify::email::EmailPublisher;
use crate::notify::telegram::TelegramPublisher;
use crate::notify::{LogPublisher, Publisher};
use crate::ocr::recorded::RecordedRecognizer;
use crate::ocr::tesseract::TesseractRecognizer;
use crate::ocr::{OcrPage, Recognizer};
use crate::reconstruct::{PassCounts, ReconstructedNotice, Reconstructor};
use crate::source::providers::{page::PageImageSource, rss::RssImageSource};
use crate::source::{ImageRef, ImageSource};

/// The I/O side of a run.
pub struct Collaborators {
    pub source: Box<dyn ImageSource>,
    pub fetcher: Box<dyn ImageFetcher>,
    pub recognizer: Box<dyn Recognizer>,
    pub publisher: Box<dyn Publisher>,
    pub history: Box<dyn HistoryStore>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub notice: ReconstructedNotice,
    pub image: ImageRef,
    pub channel: &'static str,
    pub counts: PassCounts,
}

pub struct Relay {
    parts: Collaborators,
    reconstructor: Reconstructor,
    require_date: bool,
}

impl Relay {
    pub fn new(parts: Collaborators, reconstructor: Reconstructor) -> Self {
        Self {
            parts,
            reconstructor,
            require_date: true,
        }
    }

    pub fn with_require_date(mut self, on: bool) -> Self {
        self.require_date = on;
        self
    }

    /// Wire concrete collaborators from config (+ env for channel secrets).
    /// Any failure here is a [`RelayError::Config`] counted under `stage="config"`.
    pub fn from_config(cfg: &RelayConfig) -> Result<Self, RelayError> {
        Self::wire(cfg).map_err(|e| {
            let err = RelayError::Config(e);
            crate::metrics::ensure_described();
            counter!("relay_failures_total", "stage" => err.stage()).increment(1);
            warn!(target: "relay", stage = err.stage(), "{err}");
            err
        })
    }

    fn wire(cfg: &RelayConfig) -> Result<Self> {
        cfg.validate()?;
        let reconstructor = Reconstructor::new(cfg.reconstruct.clone())?;

        if cfg.source.url.trim().is_empty() {
            return Err(anyhow!(
                "source.url is empty (set it in the config file or via RELAY_SOURCE_URL)"
            ));
        }
        let source: Box<dyn ImageSource> = match cfg.source.kind {
            SourceKind::Page => Box::new(PageImageSource::from_url(
                cfg.source.url.clone(),
                cfg.source.image_pattern.as_deref(),
            )?),
            SourceKind::Rss => Box::new(RssImageSource::from_url(cfg.source.url.clone())?),
        };

        let fetcher =
            Box::new(HttpImageFetcher::new(cfg.fetch.dir.clone()).with_timeout(cfg.fetch.timeout_secs));

        let recognizer: Box<dyn Recognizer> = match cfg.ocr.engine {
            OcrEngine::Tesseract => Box::new(
                TesseractRecognizer::new(cfg.ocr.binary.clone())
                    .with_lang(cfg.ocr.lang.clone())
                    .with_psm(cfg.ocr.psm),
            ),
            OcrEngine::Recorded => {
                let p = cfg
                    .ocr
                    .recorded_path
                    .clone()
                    .context("ocr.recorded_path missing")?;
                Box::new(RecordedRecognizer::from_path(p))
            }
        };

        let publisher: Box<dyn Publisher> = match cfg.publish.channel {
            Channel::Telegram => {
                let mut p = TelegramPublisher::from_env()?;
                if let Some(base) = &cfg.publish.telegram_api_base {
                    p = p.with_api_base(base.clone());
                }
                Box::new(p)
            }
            Channel::Discord => {
                let hook = cfg
                    .publish
                    .discord_webhook
                    .clone()
                    .context("discord channel needs DISCORD_WEBHOOK_URL")?;
                Box::new(DiscordPublisher::new(hook).with_timeout(cfg.fetch.timeout_secs))
            }
            Channel::Email => Box::new(EmailPublisher::from_env()?),
            Channel::Log => Box::new(LogPublisher),
        };

        let history = Box::new(FileHistory::new(cfg.history.path.clone(), cfg.history.window));

        let parts = Collaborators {
            source,
            fetcher,
            recognizer,
            publisher,
            history,
        };
        Ok(Self::new(parts, reconstructor).with_require_date(cfg.pipeline.require_date))
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.parts.history.as_ref()
    }

    /// Run every stage once. Telemetry is recorded for every outcome.
    pub async fn run_once(&self) -> Result<RunOutcome, RelayError> {
        crate::metrics::ensure_described();
        counter!("relay_runs_total").increment(1);
        let t0 = Instant::now();

        let res = self.run_stages().await;

        histogram!("relay_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("relay_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        match &res {
            Ok(out) => {
                counter!("relay_published_total").increment(1);
                info!(
                    target: "relay",
                    id = %out.notice.id,
                    channel = out.channel,
                    fingerprint = %short_hash(&out.notice.text),
                    "notice published"
                );
            }
            Err(e) if e.is_duplicate() => {
                counter!("relay_duplicates_total").increment(1);
                info!(target: "relay", "{e}");
            }
            Err(e) => {
                counter!("relay_failures_total", "stage" => e.stage()).increment(1);
                warn!(target: "relay", stage = e.stage(), "run failed: {e}");
            }
        }
        res
    }

    async fn run_stages(&self) -> Result<RunOutcome, RelayError> {
        let p = &self.parts;

        let image = p
            .source
            .latest_image()
            .await
            .map_err(|source| RelayError::FeedAccess {
                source_name: p.source.name(),
                source,
            })?;
        info!(target: "relay", url = %image.url, source = %image.source, "bulletin image located");

        let local = p
            .fetcher
            .fetch(&image)
            .await
            .map_err(RelayError::ImageTransfer)?;

        let page = p
            .recognizer
            .recognize(&local)
            .await
            .and_then(|page| page.validate().map(|_| page))
            .map_err(|source| RelayError::Recognition {
                engine: p.recognizer.name(),
                source,
            })?;

        let (notice, counts) = self.reconstruct_page(&page);

        if self.require_date && !notice.has_date() {
            return Err(RelayError::MissingDate { id: notice.id });
        }

        if p.history
            .contains(&notice.id)
            .await
            .map_err(RelayError::History)?
        {
            return Err(RelayError::Duplicate(notice.id));
        }

        p.publisher
            .publish(&notice.text)
            .await
            .map_err(|source| RelayError::Publish {
                channel: p.publisher.name(),
                source,
            })?;

        p.history
            .record(&notice.id)
            .await
            .map_err(RelayError::History)?;

        Ok(RunOutcome {
            notice,
            image,
            channel: p.publisher.name(),
            counts,
        })
    }

    /// Core step only; also used by the offline `reconstruct` command.
    pub fn reconstruct_page(&self, page: &OcrPage) -> (ReconstructedNotice, PassCounts) {
        let (notice, counts) = self.reconstructor.reconstruct_counted(&page.to_raw_lines());
        counter!("relay_lines_filtered_total").increment(counts.filtered as u64);
        counter!("relay_lines_misaligned_total").increment(counts.misaligned as u64);
        (notice, counts)
    }
}
