// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod history;
pub mod metrics;
pub mod notify;
pub mod ocr;
pub mod pipeline;
pub mod reconstruct;
pub mod scheduler;
pub mod source;

// ---- Re-exports for stable public API ----
pub use crate::error::RelayError;
pub use crate::pipeline::{Collaborators, Relay, RunOutcome};
pub use crate::reconstruct::{RawLine, ReconstructConfig, ReconstructedNotice, Reconstructor};
