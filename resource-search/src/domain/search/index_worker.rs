//! Background worker for periodic embedding backfill.

use std::time::Duration;

use tracing::{error, info};

use super::traits::{DocumentStore, Embedder};
use super::DocumentIndexer;

/// Runs `backfill_missing` on a fixed interval until the task is dropped.
///
/// Errors are logged and the next cycle proceeds as usual.
pub async fn run_backfill_worker<E, R>(indexer: DocumentIndexer<E, R>, interval: Duration)
where
    E: Embedder,
    R: DocumentStore,
{
    info!(
        interval_secs = interval.as_secs(),
        "Embedding backfill background task started"
    );

    let mut ticker = tokio::time::interval(interval);

    // Skip the first immediate tick to let the app fully start
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match indexer.backfill_missing().await {
            Ok(stats) if stats.embedded > 0 || stats.failed > 0 => {
                info!(
                    embedded = stats.embedded,
                    failed = stats.failed,
                    "Backfill cycle completed"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Backfill cycle failed"),
        }
    }
}
