//! Fixed-interval driver for the fetcher.

use std::future::Future;
use std::time::Duration;

use calsnap_pipeline::ImageFetcher;
use tokio::time::MissedTickBehavior;

use crate::log_failure;

/// Run `fetcher` every `interval` until `shutdown` resolves.
///
/// A failed tick is logged and the loop carries on. `shutdown` is polled while
/// waiting for the next tick and while a run is in flight; an interrupted run
/// is dropped.
pub async fn poll_loop<F>(fetcher: &ImageFetcher, interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::warn!("Shutdown during fetch, abandoning the run in flight");
                break;
            }
            result = fetcher.run() => match result {
                Ok(outcome) => tracing::info!(outcome = ?outcome, "Fetch finished"),
                Err(e) => log_failure(&anyhow::Error::from(e)),
            },
        }
    }

    tracing::info!("Shutdown signal received, stopping poll loop");
}
