//! outage-relay binary entrypoint.
//! Loads config, wires collaborators and dispatches the CLI subcommand.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use outage_relay::cli::{Cli, Command};
use outage_relay::config::RelayConfig;
use outage_relay::history::{FileHistory, HistoryStore};
use outage_relay::metrics::Metrics;
use outage_relay::ocr::{recorded::load_page, tesseract::parse_tsv, OcrPage};
use outage_relay::pipeline::Relay;
use outage_relay::RelayError;
use outage_relay::reconstruct::Reconstructor;
use outage_relay::scheduler;

/// Compact logs by default; RELAY_LOG_JSON=1 switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("relay=info,notify=info,scheduler=info,metrics=info,warn")
    });
    let json = std::env::var("RELAY_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn load_config(cli: &Cli) -> Result<RelayConfig> {
    match &cli.config {
        Some(p) => {
            let mut cfg = RelayConfig::load_from(p)?;
            cfg.apply_env();
            cfg.validate()?;
            Ok(cfg)
        }
        None => RelayConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(&cli).map_err(RelayError::Config)?;

    match cli.command {
        Command::Run => {
            let relay = Relay::from_config(&cfg)?;
            match relay.run_once().await {
                Ok(out) => println!("{}", out.notice.id),
                Err(e) if e.is_duplicate() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Command::Watch { interval } => {
            let relay = Relay::from_config(&cfg)?;
            if let Some(addr) = cfg.metrics.listen.clone() {
                let metrics = Metrics::init()?;
                tokio::spawn(async move {
                    if let Err(e) = metrics.serve(&addr).await {
                        tracing::warn!(target: "metrics", "metrics server stopped: {e:#}");
                    }
                });
            }
            scheduler::watch(&relay, interval.unwrap_or(cfg.pipeline.interval_secs)).await;
        }
        Command::Reconstruct { input, tsv } => {
            let page = if tsv {
                let raw = tokio::fs::read_to_string(&input)
                    .await
                    .with_context(|| format!("reading {}", input.display()))?;
                parse_tsv(&raw)?
            } else {
                load_page(&input).await?
            };
            print_notice(&Reconstructor::new(cfg.reconstruct.clone())?, &page)?;
        }
        Command::History => {
            let store = FileHistory::new(cfg.history.path.clone(), cfg.history.window);
            let ids = store.recent().await?;
            if ids.is_empty() {
                eprintln!("no notices recorded in {}", store.path().display());
            }
            for id in ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn print_notice(rec: &Reconstructor, page: &OcrPage) -> Result<()> {
    let notice = rec.reconstruct(&page.to_raw_lines());
    println!("{}", serde_json::to_string_pretty(&notice)?);
    Ok(())
}
