use std::sync::Arc;
use std::time::Duration;

use crate::sync::product_sync::{ProductSync, RetryReport};

/// Retry loop for the stock mirror outbox. Runs until the task is dropped.
pub async fn run_processor(sync: Arc<ProductSync>, interval: Duration) {
    tracing::info!("🔄 Stock mirror processor started");

    loop {
        let report = process_next_batch(&sync).await;
        if report.failed > 0 {
            tracing::error!("❌ {} stock mirror(s) gave up", report.failed);
        }
        tokio::time::sleep(interval).await;
    }
}

/// One pass over the outbox; idle passes are silent. Applied and skipped
/// entries are pruned on every pass.
pub async fn process_next_batch(sync: &ProductSync) -> RetryReport {
    if sync.outbox().pending().is_empty() {
        sync.outbox().prune_finished();
        return RetryReport::default();
    }

    let report = sync.retry_pending().await;
    tracing::info!(
        "⚙️ Outbox pass: {} applied, {} skipped, {} pending, {} failed",
        report.applied,
        report.skipped,
        report.still_pending,
        report.failed
    );
    sync.outbox().prune_finished();
    report
}
