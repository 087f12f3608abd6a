//! Periodic trigger for the resolution pipeline.

use std::sync::Arc;
use std::time::Duration;

use crate::resolution::ResolutionRunner;

/// Spawn the resolution ticker: one run every `interval`, run-to-completion.
///
/// Each run is awaited before the next tick is taken, so runs never overlap
/// in-process — which the reply-authorship resolution check relies on. A
/// failed run is logged and retried at the next tick; the due-thread filter
/// makes that retry safe.
pub fn spawn_resolution_ticker(
    runner: Arc<ResolutionRunner>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip immediate first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = runner.run_once().await {
                tracing::error!(error = %e, "Resolution run failed, retrying next tick");
            }
        }
    })
}
