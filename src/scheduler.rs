// src/scheduler.rs
use std::time::Duration;

use crate::pipeline::Relay;

/// Run the relay every `interval_secs` until Ctrl-C. A failed run is logged
/// (inside `run_once`) and the loop keeps ticking.
pub async fn watch(relay: &Relay, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = relay.run_once().await;
                tracing::debug!(target: "scheduler", ok = outcome.is_ok(), "watch tick");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target: "scheduler", "shutdown requested");
                break;
            }
        }
    }
}
