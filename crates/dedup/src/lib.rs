//! # logdup dedup
//!
//! The near-duplicate ingestion pipeline. For each batch of [`LogEntry`]
//! values the [`DedupEngine`]:
//!
//! 1. validates every entry and derives its content-hash id,
//! 2. embeds the texts and asks the vector store for each one's nearest
//!    stored neighbour,
//! 3. marks an entry as a duplicate when that neighbour scores at or above
//!    `insert_sim_threshold`, and as canonical otherwise,
//! 4. writes a provenance row per entry to the lookup store and stores the
//!    canonical entries as new points.
//!
//! A separate [`DedupEngine::relink`] pass computes second-nearest-neighbour
//! edges for entries not yet relinked.
//!
//! ```
//! use dedup::{DedupConfig, DedupEngine, LogEntry};
//! use perceptual::FingerprintConfig;
//!
//! let engine = DedupEngine::in_memory(FingerprintConfig::default(), DedupConfig::default()).unwrap();
//! let line = LogEntry::new("worker 12 finished job 8812 in 341ms").with_field("pod_name", "api-1");
//! let report = engine.ingest(&[line.clone()]).unwrap();
//! assert_eq!(report.canonical, 1);
//!
//! let again = engine.ingest(&[line]).unwrap();
//! assert_eq!(again.duplicates, 1);
//! ```
//!
//! ## Observability
//!
//! Install a [`DedupMetrics`] implementation via [`set_dedup_metrics`] to
//! receive per-batch latency and decision counts.

pub mod embedder;
pub mod engine;
pub mod error;
pub mod metrics;
mod relink;
pub mod types;

pub use crate::embedder::{Embedder, Embedding, LshEmbedder};
pub use crate::engine::DedupEngine;
pub use crate::error::{DedupError, ErrorKind};
pub use crate::metrics::{set_dedup_metrics, DedupMetrics};
pub use crate::types::{
    BatchReport, DedupConfig, Decision, IngestOutcome, LogEntry, RelinkEdge, DEGENERATE_KEY,
    INSERT_TIMESTAMP_KEY, SIM_SYNC_KEY, TEXT_KEY,
};
