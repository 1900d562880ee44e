//! Workspace umbrella crate for logdup, near-duplicate detection for log
//! lines.
//!
//! Re-exports the member crates and wires a [`DedupEngine`] from a
//! [`LogdupConfig`] so callers need a single dependency.
//!
//! ```
//! use logdup::{build_engine, LogEntry, LogdupConfig};
//!
//! let engine = build_engine(&LogdupConfig::default()).unwrap();
//! let report = engine
//!     .ingest(&[LogEntry::new("disk /dev/sda1 at 91% on node-7")])
//!     .unwrap();
//! assert_eq!(report.canonical, 1);
//! ```

pub mod config;

pub use crate::config::{ConfigLoadError, LogdupConfig, VectorStoreConfig};

pub use canonical::{
    canonical_json, collapse_whitespace, content_id, content_uuid, normalize, NormalizeConfig,
    NormalizedText, LOGDUP_NAMESPACE,
};
pub use dedup::{
    set_dedup_metrics, BatchReport, Decision, DedupConfig, DedupEngine, DedupError, DedupMetrics,
    Embedder, Embedding, ErrorKind, IngestOutcome, LogEntry, LshEmbedder, RelinkEdge,
};
pub use filter::{compile, compile_json, parse_specs, CompileMode, FilterError, Predicate};
pub use index::{
    Distance, IndexError, LookupBackendConfig, LookupRecord, LookupStore, ScoredPoint,
    StoredPoint, VectorBackendConfig, VectorStore,
};
pub use perceptual::{
    jaccard, shingle, signature_jaccard, FingerprintConfig, FingerprintError, Fingerprinter,
    LshEmbedding, MetricError,
};

use std::sync::Arc;

use tracing::info;

/// Build the stores named by `cfg` and an engine over them.
///
/// Store connections are opened here; a missing backend feature or an
/// unreachable store fails with [`ErrorKind::Upstream`].
pub fn build_engine(cfg: &LogdupConfig) -> Result<DedupEngine, DedupError> {
    let embedder =
        LshEmbedder::new(cfg.fingerprint_config())?.with_distance(cfg.vector_store.distance);
    let vectors = cfg.vector_store.backend.build()?;
    let lookups = cfg.lookup_store.build()?;
    info!(
        collection = cfg.vector_store.backend.collection(),
        distance = %cfg.vector_store.distance,
        "stores connected"
    );
    DedupEngine::new(Arc::new(embedder), vectors, lookups, cfg.pipeline.clone())
}
