use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DedupError;

/// Payload flag cleared on insert and set by [`crate::DedupEngine::mark_relinked`].
pub const SIM_SYNC_KEY: &str = "sim_sync";
/// Payload field holding the ingestion time (RFC 3339, `Z` suffix).
pub const INSERT_TIMESTAMP_KEY: &str = "insert_timestamp";
/// Payload field holding the raw entry text.
pub const TEXT_KEY: &str = "text";
/// Payload flag set on points whose text produced no features.
pub const DEGENERATE_KEY: &str = "degenerate";

/// One raw log line plus caller metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// RFC 3339 UTC timestamp with a `Z` suffix. Defaults to the ingestion time.
    #[serde(default)]
    pub insert_timestamp: Option<String>,
}

impl LogEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
            insert_timestamp: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_insert_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.insert_timestamp = Some(ts.into());
        self
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Top-1 score at or above which an entry is a duplicate.
    pub insert_sim_threshold: f64,
    /// Page size of the relink scroll.
    pub sim_sync_batch_size: usize,
    /// Metadata field holding the event time for the lookup row.
    pub timestamp_key: String,
    /// Metadata field holding the emitting location for the lookup row.
    pub location_key: String,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            insert_sim_threshold: 0.9,
            sim_sync_batch_size: 100,
            timestamp_key: "timestamp".to_string(),
            location_key: "pod_name".to_string(),
        }
    }
}

impl DedupConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.insert_sim_threshold = threshold;
        self
    }

    pub fn with_sim_sync_batch_size(mut self, size: usize) -> Self {
        self.sim_sync_batch_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), DedupError> {
        if !self.insert_sim_threshold.is_finite() {
            return Err(DedupError::InvalidConfig(
                "insert_sim_threshold must be a finite number".into(),
            ));
        }
        if self.sim_sync_batch_size == 0 {
            return Err(DedupError::InvalidConfig(
                "sim_sync_batch_size must be greater than zero".into(),
            ));
        }
        if self.timestamp_key.trim().is_empty() || self.location_key.trim().is_empty() {
            return Err(DedupError::InvalidConfig(
                "timestamp_key and location_key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of the dedup decision for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Stored as a new point; the lookup row points at itself.
    Canonical,
    /// Not stored; the lookup row points at `closest_id`.
    Duplicate { closest_id: String, similarity: f64 },
}

impl Decision {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Decision::Duplicate { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub id: String,
    pub decision: Decision,
    /// False when a lookup row with this id already existed.
    pub lookup_written: bool,
}

/// Per-batch result of [`crate::DedupEngine::ingest`], in input order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<IngestOutcome>,
    pub canonical: usize,
    pub duplicates: usize,
}

/// Second-nearest-neighbour edge produced by the relink job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelinkEdge {
    pub id: String,
    pub neighbor_id: String,
    pub similarity: f64,
}
