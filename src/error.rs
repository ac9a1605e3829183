use thiserror::Error;

/// One variant per pipeline stage that can fail. Collaborator errors ride
/// along as `anyhow::Error` sources.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("feed access failed ({source_name}): {source:#}")]
    FeedAccess {
        source_name: &'static str,
        source: anyhow::Error,
    },

    #[error("image transfer failed: {0:#}")]
    ImageTransfer(#[source] anyhow::Error),

    #[error("recognition failed ({engine}): {source:#}")]
    Recognition {
        engine: &'static str,
        source: anyhow::Error,
    },

    #[error("no date line found in bulletin (id would be `{id}`)")]
    MissingDate { id: String },

    #[error("notice `{0}` was already published")]
    Duplicate(String),

    #[error("publish via {channel} failed: {source:#}")]
    Publish {
        channel: &'static str,
        source: anyhow::Error,
    },

    #[error("history store failed: {0:#}")]
    History(#[source] anyhow::Error),

    #[error("configuration error: {0:#}")]
    Config(#[source] anyhow::Error),
}

impl RelayError {
    /// Already-seen is an expected outcome, not an incident.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RelayError::Duplicate(_))
    }

    /// Short stage label for logs and the `relay_failures_total{stage}` counter.
    pub fn stage(&self) -> &'static str {
        match self {
            RelayError::FeedAccess { .. } => "feed",
            RelayError::ImageTransfer(_) => "fetch",
            RelayError::Recognition { .. } => "ocr",
            RelayError::MissingDate { .. } => "reconstruct",
            RelayError::Duplicate(_) => "dedup",
            RelayError::Publish { .. } => "publish",
            RelayError::History(_) => "history",
            RelayError::Config(_) => "config",
        }
    }
}
