use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::TimeZone;
use index::{Distance, IndexError};
use serde_json::json;

use crate::error::ErrorKind;
use crate::metrics::{set_dedup_metrics, DedupMetrics};

fn engine() -> DedupEngine {
    DedupEngine::in_memory(FingerprintConfig::default(), DedupConfig::default()).unwrap()
}

fn engine_with_store(store: impl VectorStore + 'static, cfg: DedupConfig) -> DedupEngine {
    let embedder = LshEmbedder::new(FingerprintConfig::default()).unwrap();
    DedupEngine::new(
        Arc::new(embedder),
        Box::new(store),
        Box::new(InMemoryLookupStore::new()),
        cfg,
    )
    .unwrap()
}

/// In-memory store that reports a fixed score for every hit.
struct ScriptedStore {
    inner: InMemoryVectorStore,
    score: f32,
}

impl ScriptedStore {
    fn new(score: f32) -> Self {
        Self {
            inner: InMemoryVectorStore::new("scripted"),
            score,
        }
    }
}

impl VectorStore for ScriptedStore {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn create_collection_if_absent(
        &self,
        vector_size: usize,
        distance: Distance,
    ) -> Result<bool, IndexError> {
        self.inner.create_collection_if_absent(vector_size, distance)
    }

    fn delete_collection_if_exists(&self) -> Result<bool, IndexError> {
        self.inner.delete_collection_if_exists()
    }

    fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError> {
        self.inner.upsert(points)
    }

    fn query(
        &self,
        vector: &[f32],
        filter: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let mut hits = self.inner.query(vector, filter, limit)?;
        for hit in &mut hits {
            hit.score = self.score;
        }
        Ok(hits)
    }

    fn scroll(
        &self,
        filter: Option<&Predicate>,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, IndexError> {
        self.inner.scroll(filter, limit, with_vectors)
    }

    fn delete_where(&self, filter: &Predicate) -> Result<(), IndexError> {
        self.inner.delete_where(filter)
    }

    fn set_payload_where(&self, payload: Payload, filter: &Predicate) -> Result<(), IndexError> {
        self.inner.set_payload_where(payload, filter)
    }

    fn count(&self, filter: Option<&Predicate>) -> Result<usize, IndexError> {
        self.inner.count(filter)
    }
}

/// Store whose reads and writes always fail.
struct UnavailableStore;

impl VectorStore for UnavailableStore {
    fn collection(&self) -> &str {
        "unavailable"
    }

    fn create_collection_if_absent(&self, _: usize, _: Distance) -> Result<bool, IndexError> {
        Ok(false)
    }

    fn delete_collection_if_exists(&self) -> Result<bool, IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn upsert(&self, _: Vec<Point>) -> Result<(), IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn query(
        &self,
        _: &[f32],
        _: Option<&Predicate>,
        _: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn scroll(
        &self,
        _: Option<&Predicate>,
        _: usize,
        _: bool,
    ) -> Result<Vec<StoredPoint>, IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn delete_where(&self, _: &Predicate) -> Result<(), IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn set_payload_where(&self, _: Payload, _: &Predicate) -> Result<(), IndexError> {
        Err(IndexError::backend("connection refused"))
    }

    fn count(&self, _: Option<&Predicate>) -> Result<usize, IndexError> {
        Err(IndexError::backend("connection refused"))
    }
}

#[test]
fn first_entry_is_canonical_and_self_linked() {
    let engine = engine();
    let entry = LogEntry::new("payment service timed out after 30s calling ledger")
        .with_field("pod_name", "payments-7");
    let report = engine.ingest(&[entry]).unwrap();

    assert_eq!(report.canonical, 1);
    assert_eq!(report.duplicates, 0);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.decision, Decision::Canonical);
    assert!(outcome.lookup_written);

    let row = engine.find_near_occurrences(&outcome.id).unwrap().unwrap();
    assert!(row.is_canonical());
    assert_eq!(row.location.as_deref(), Some("payments-7"));

    let stored = engine.scroll(&[], 10).unwrap();
    assert_eq!(stored.len(), 1);
    let payload = &stored[0].payload;
    assert_eq!(payload.get(SIM_SYNC_KEY), Some(&json!(false)));
    assert_eq!(payload.get("pod_name"), Some(&json!("payments-7")));
    assert!(payload
        .get(INSERT_TIMESTAMP_KEY)
        .and_then(Value::as_str)
        .is_some_and(|ts| ts.ends_with('Z')));
    assert!(payload.get(TEXT_KEY).is_some());
}

#[test]
fn reingesting_identical_entry_is_idempotent() {
    let engine = engine();
    let entry = LogEntry::new("cache miss for key session:abc").with_field("pod_name", "web-1");

    let first = engine.ingest(&[entry.clone()]).unwrap();
    let second = engine.ingest(&[entry]).unwrap();

    assert_eq!(first.outcomes[0].id, second.outcomes[0].id);
    match &second.outcomes[0].decision {
        Decision::Duplicate { closest_id, .. } => assert_eq!(closest_id, &first.outcomes[0].id),
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert!(!second.outcomes[0].lookup_written);
    assert_eq!(engine.vector_store().count(None).unwrap(), 1);
}

#[test]
fn score_above_threshold_records_duplicate_without_insert() {
    let engine = engine_with_store(ScriptedStore::new(0.97), DedupConfig::default().with_threshold(0.9));
    let original = engine
        .ingest(&[LogEntry::new("disk /dev/sda1 usage at 91 percent")])
        .unwrap();
    let original_id = original.outcomes[0].id.clone();

    let report = engine
        .ingest(&[LogEntry::new("completely different words but scripted score")])
        .unwrap();
    let outcome = &report.outcomes[0];
    match &outcome.decision {
        Decision::Duplicate {
            closest_id,
            similarity,
        } => {
            assert_eq!(closest_id, &original_id);
            assert!((similarity - 0.97).abs() < 1e-6);
        }
        other => panic!("expected duplicate, got {other:?}"),
    }

    let row = engine.find_near_occurrences(&outcome.id).unwrap().unwrap();
    assert_eq!(row.closest_log_id, original_id);
    assert!((row.similarity - 0.97).abs() < 1e-6);
    assert_eq!(engine.vector_store().count(None).unwrap(), 1);
}

#[test]
fn score_below_threshold_is_canonical() {
    let engine = engine_with_store(ScriptedStore::new(0.5), DedupConfig::default().with_threshold(0.9));
    engine.ingest(&[LogEntry::new("first line of the day")]).unwrap();
    let report = engine.ingest(&[LogEntry::new("second line of the day")]).unwrap();

    assert_eq!(report.outcomes[0].decision, Decision::Canonical);
    assert_eq!(engine.vector_store().count(None).unwrap(), 2);
}

#[test]
fn near_duplicates_in_one_batch_are_both_canonical() {
    let engine = engine();
    let batch = [
        LogEntry::new("user 1234 logged in from 10.0.0.1"),
        LogEntry::new("user 5678 logged in from 10.0.0.2"),
    ];
    let report = engine.ingest(&batch).unwrap();
    assert_eq!(report.canonical, 2);
    assert_ne!(report.outcomes[0].id, report.outcomes[1].id);
    assert_eq!(engine.vector_store().count(None).unwrap(), 2);

    let later = engine
        .ingest(&[LogEntry::new("user 9999 logged in from 10.0.0.3")])
        .unwrap();
    assert!(later.outcomes[0].decision.is_duplicate());
}

#[test]
fn malformed_timestamp_fails_batch_before_any_write() {
    let engine = engine();
    let batch = [
        LogEntry::new("fine entry number one"),
        LogEntry::new("bad entry").with_insert_timestamp("2025-03-01 12:00:00"),
    ];
    let err = engine.ingest(&batch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        DedupError::InvalidTimestamp { index, field, .. } => {
            assert_eq!(index, 1);
            assert_eq!(field, INSERT_TIMESTAMP_KEY);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.vector_store().count(None).unwrap(), 0);
    assert_eq!(engine.lookup_store().delete_all().unwrap(), 0);
}

#[test]
fn offset_insert_timestamp_is_rejected() {
    let engine = engine();
    let entry = LogEntry::new("offset timestamp").with_insert_timestamp("2025-03-01T12:00:00+02:00");
    assert!(matches!(
        engine.ingest(&[entry]),
        Err(DedupError::InvalidTimestamp { .. })
    ));
}

#[test]
fn metadata_timestamp_and_location_feed_lookup_row() {
    let engine = engine();
    let entry = LogEntry::new("order 42 shipped")
        .with_field("timestamp", "2025-03-01T12:00:00Z")
        .with_field("pod_name", "shipping-2");
    let report = engine.ingest(&[entry]).unwrap();
    let row = engine
        .find_near_occurrences(&report.outcomes[0].id)
        .unwrap()
        .unwrap();
    assert_eq!(row.timestamp, Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
    assert_eq!(row.location.as_deref(), Some("shipping-2"));

    let bad = LogEntry::new("order 43 shipped").with_field("timestamp", "yesterday");
    assert!(matches!(
        engine.ingest(&[bad]),
        Err(DedupError::InvalidTimestamp { .. })
    ));
}

#[test]
fn explicit_insert_timestamp_is_kept_in_payload() {
    let engine = engine();
    let entry = LogEntry::new("scheduled job kicked off").with_insert_timestamp("2025-01-02T03:04:05Z");
    engine.ingest(&[entry]).unwrap();
    let stored = engine.scroll(&[], 1).unwrap();
    assert_eq!(
        stored[0].payload.get(INSERT_TIMESTAMP_KEY),
        Some(&json!("2025-01-02T03:04:05Z"))
    );
}

#[test]
fn degenerate_entries_never_match() {
    let engine = engine();
    let report = engine
        .ingest(&[
            LogEntry::new("ab").with_field("pod_name", "a"),
            LogEntry::new("ab").with_field("pod_name", "b"),
        ])
        .unwrap();
    assert_eq!(report.canonical, 2);
    assert_ne!(report.outcomes[0].id, report.outcomes[1].id);

    let again = engine.ingest(&[LogEntry::new("cd")]).unwrap();
    assert_eq!(again.outcomes[0].decision, Decision::Canonical);

    let real = engine
        .ingest(&[LogEntry::new("kernel: out of memory, killed process 4312")])
        .unwrap();
    assert_eq!(real.outcomes[0].decision, Decision::Canonical);

    let flagged = Predicate::field_equals(DEGENERATE_KEY, true);
    assert_eq!(engine.vector_store().count(Some(&flagged)).unwrap(), 3);
}

#[test]
fn search_and_scroll_apply_filters() {
    let engine = engine();
    engine
        .ingest(&[
            LogEntry::new("request to /checkout failed with status 502").with_field("pod_name", "web-1"),
            LogEntry::new("background compaction finished for shard seven").with_field("pod_name", "web-2"),
        ])
        .unwrap();

    let only_web2 = [json!({"key": "pod_name", "op": "equals", "value": "web-2"})];
    let hits = engine
        .search("request to /checkout failed with status 502", &only_web2, 5)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload.get("pod_name"), Some(&json!("web-2")));

    let unfiltered = engine
        .search("request to /checkout failed with status 502", &[], 1)
        .unwrap();
    assert_eq!(unfiltered[0].payload.get("pod_name"), Some(&json!("web-1")));

    let either = [json!({"key": "pod_name", "op": "in", "value": ["web-1", "web-2"]})];
    assert_eq!(engine.scroll(&either, 10).unwrap().len(), 2);
}

#[test]
fn invalid_filter_is_a_validation_error() {
    let engine = engine();
    let err = engine
        .search("anything", &[json!({"op": "equals", "value": 1})], 3)
        .unwrap_err();
    assert!(matches!(err, DedupError::Filter(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn delete_where_requires_a_filter() {
    let engine = engine();
    engine
        .ingest(&[
            LogEntry::new("nightly backup completed").with_field("pod_name", "ops-1"),
            LogEntry::new("tls certificate expires soon").with_field("pod_name", "ops-2"),
        ])
        .unwrap();

    assert!(matches!(engine.delete_where(&[]), Err(DedupError::EmptyFilter)));
    engine
        .delete_where(&[json!({"key": "pod_name", "value": "ops-1"})])
        .unwrap();
    assert_eq!(engine.vector_store().count(None).unwrap(), 1);
}

#[test]
fn clear_and_reset() {
    let engine = engine();
    let report = engine
        .ingest(&[LogEntry::new("replica lag above threshold on db-3")])
        .unwrap();
    let id = report.outcomes[0].id.clone();

    engine.clear().unwrap();
    assert!(engine.find_near_occurrences(&id).unwrap().is_none());
    assert!(matches!(
        engine.vector_store().count(None),
        Err(IndexError::CollectionNotFound(_))
    ));

    engine.reset().unwrap();
    assert_eq!(engine.vector_store().count(None).unwrap(), 0);
    let again = engine
        .ingest(&[LogEntry::new("replica lag above threshold on db-3")])
        .unwrap();
    assert_eq!(again.outcomes[0].decision, Decision::Canonical);
}

#[test]
fn relink_skips_self_and_marks_entries() {
    let engine = engine_with_store(ScriptedStore::new(0.4), DedupConfig::default());
    engine
        .ingest(&[LogEntry::new("alpha service started on port 8080")])
        .unwrap();
    engine
        .ingest(&[LogEntry::new("beta service started on port 9090")])
        .unwrap();
    engine
        .ingest(&[LogEntry::new("gamma worker drained its queue")])
        .unwrap();

    let edges = engine.relink().unwrap();
    assert_eq!(edges.len(), 3);
    for edge in &edges {
        assert_ne!(edge.id, edge.neighbor_id);
        assert!((edge.similarity - 0.4).abs() < 1e-6);
    }

    assert_eq!(engine.mark_relinked(&edges).unwrap(), 3);
    let synced = Predicate::field_equals(SIM_SYNC_KEY, true);
    assert_eq!(engine.vector_store().count(Some(&synced)).unwrap(), 3);
    assert!(engine.relink().unwrap().is_empty());
}

#[test]
fn relink_with_single_entry_has_no_edges() {
    let engine = engine();
    engine
        .ingest(&[LogEntry::new("lonely line with no neighbours")])
        .unwrap();
    assert!(engine.relink().unwrap().is_empty());
    assert_eq!(engine.mark_relinked(&[]).unwrap(), 0);
}

#[test]
fn similarity_uses_signature_match_rate() {
    let engine = engine();
    let same = engine
        .similarity("GET /health 200", "GET /health 200")
        .unwrap();
    assert_eq!(same, 1.0);
    let different = engine
        .similarity("GET /health 200", "kafka consumer rebalanced partitions")
        .unwrap();
    assert!(different < 0.5);
}

#[test]
fn upstream_failures_propagate() {
    let engine = engine_with_store(UnavailableStore, DedupConfig::default());
    let err = engine
        .ingest(&[LogEntry::new("any line will do here")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn bad_fingerprint_config_is_fatal() {
    let cfg = FingerprintConfig::default()
        .with_num_hashes(100)
        .with_bands(7);
    let err = DedupEngine::in_memory(cfg, DedupConfig::default())
        .err()
        .expect("construction should fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[derive(Default)]
struct CountingMetrics {
    batches: AtomicUsize,
    canonical: AtomicUsize,
}

impl DedupMetrics for CountingMetrics {
    fn record_batch(&self, _latency: Duration, canonical: usize, _duplicates: usize) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.canonical.fetch_add(canonical, Ordering::SeqCst);
    }

    fn record_relink(&self, _latency: Duration, _scanned: usize, _edges: usize) {}
}

#[test]
fn metrics_recorder_sees_batches() {
    let metrics = Arc::new(CountingMetrics::default());
    set_dedup_metrics(Some(metrics.clone()));

    let engine = engine();
    engine
        .ingest(&[LogEntry::new("metrics hook smoke test line")])
        .unwrap();
    set_dedup_metrics(None);

    // Other tests may run concurrently against the same global recorder.
    assert!(metrics.batches.load(Ordering::SeqCst) >= 1);
    assert!(metrics.canonical.load(Ordering::SeqCst) >= 1);
}
