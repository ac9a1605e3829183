pub mod discord;
pub mod email;
pub mod telegram;

use anyhow::Result;

use crate::fingerprint::short_hash;

/// A messaging channel that receives the reconstructed bulletin text verbatim.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Dry-run channel: logs a fingerprint of what would have been sent.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        tracing::info!(
            target: "notify",
            fingerprint = %short_hash(text),
            lines = text.lines().count(),
            "dry-run publish"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Cut `text` to at most `max` chars, marking the cut with an ellipsis.
pub(crate) fn clamp_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
