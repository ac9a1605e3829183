use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "outage-relay", version, about = "Republish water-outage bulletins from a public feed")]
pub struct Cli {
    /// Config file (defaults to $RELAY_CONFIG_PATH, then config/relay.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once.
    Run,
    /// Run the pipeline on an interval until Ctrl-C.
    Watch {
        /// Seconds between runs (overrides pipeline.interval_secs).
        #[arg(long, env = "RELAY_INTERVAL_SECS")]
        interval: Option<u64>,
    },
    /// Rebuild a notice from recorded OCR output and print it as JSON.
    Reconstruct {
        /// OCR page JSON, or tesseract TSV with --tsv.
        input: PathBuf,
        #[arg(long)]
        tsv: bool,
    },
    /// Print the recently published notice ids, newest first.
    History,
}
