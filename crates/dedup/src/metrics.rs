// Metrics hooks for the dedup pipeline.
//
// Install a global `DedupMetrics` implementation with [`set_dedup_metrics`];
// every `DedupEngine` then reports batch and relink outcomes to it.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for ingestion and relink runs.
pub trait DedupMetrics: Send + Sync {
    /// One ingested batch: wall-clock latency plus how the entries were decided.
    fn record_batch(&self, latency: Duration, canonical: usize, duplicates: usize);

    /// One relink pass: latency, points scanned and edges produced.
    fn record_relink(&self, latency: Duration, scanned: usize, edges: usize);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn DedupMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn DedupMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn DedupMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global dedup metrics recorder.
pub fn set_dedup_metrics(recorder: Option<Arc<dyn DedupMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
