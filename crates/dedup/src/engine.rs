use std::sync::Arc;
use std::time::Instant;

use canonical::content_id;
use chrono::{DateTime, SecondsFormat, Utc};
use filter::{compile, parse_datetime, CompileMode, Condition, FieldCheck, Predicate};
use index::{
    InMemoryLookupStore, InMemoryVectorStore, LookupRecord, LookupStore, Payload, Point,
    QueryRequest, ScoredPoint, StoredPoint, VectorStore,
};
use perceptual::FingerprintConfig;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::embedder::{Embedder, Embedding, LshEmbedder};
use crate::error::DedupError;
use crate::metrics::metrics_recorder;
use crate::types::{
    BatchReport, DedupConfig, Decision, IngestOutcome, LogEntry, RelinkEdge, DEGENERATE_KEY,
    INSERT_TIMESTAMP_KEY, SIM_SYNC_KEY, TEXT_KEY,
};

#[cfg(test)]
mod tests;

/// Near-duplicate ingestion pipeline over a vector store and a lookup store.
///
/// Every ingested entry gets a content-hash id and a lookup row. Entries whose
/// nearest stored neighbour scores at or above `insert_sim_threshold` are
/// recorded as duplicates of that neighbour and not stored; all others are
/// stored as new canonical points.
pub struct DedupEngine {
    embedder: Arc<dyn Embedder>,
    vectors: Box<dyn VectorStore>,
    lookups: Box<dyn LookupStore>,
    cfg: DedupConfig,
}

/// An entry that passed validation, before any store is touched.
struct Prepared {
    id: String,
    payload: Payload,
    timestamp: DateTime<Utc>,
    location: Option<String>,
}

impl DedupEngine {
    /// Validate `cfg`, then create the collection and lookup table if needed.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Box<dyn VectorStore>,
        lookups: Box<dyn LookupStore>,
        cfg: DedupConfig,
    ) -> Result<Self, DedupError> {
        cfg.validate()?;
        let engine = Self {
            embedder,
            vectors,
            lookups,
            cfg,
        };
        engine.warm_up()?;
        info!(
            collection = engine.vectors.collection(),
            threshold = engine.cfg.insert_sim_threshold,
            "dedup engine ready"
        );
        Ok(engine)
    }

    /// Engine over in-memory stores with the LSH embedder.
    pub fn in_memory(
        fingerprint_cfg: FingerprintConfig,
        cfg: DedupConfig,
    ) -> Result<Self, DedupError> {
        let embedder = LshEmbedder::new(fingerprint_cfg)?;
        Self::new(
            Arc::new(embedder),
            Box::new(InMemoryVectorStore::new("logs")),
            Box::new(InMemoryLookupStore::new()),
            cfg,
        )
    }

    pub fn config(&self) -> &DedupConfig {
        &self.cfg
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn vector_store(&self) -> &dyn VectorStore {
        self.vectors.as_ref()
    }

    pub fn lookup_store(&self) -> &dyn LookupStore {
        self.lookups.as_ref()
    }

    fn warm_up(&self) -> Result<(), DedupError> {
        self.vectors
            .create_collection_if_absent(self.embedder.vector_size(), self.embedder.distance())?;
        self.lookups.ensure_table()?;
        Ok(())
    }

    /// Decide and store one batch.
    ///
    /// Every entry is validated before any store call, so a malformed entry
    /// fails the whole batch without side effects. Decisions are taken
    /// against the store as it was before the batch: two near-duplicates in
    /// the same batch are both stored as canonical.
    pub fn ingest(&self, entries: &[LogEntry]) -> Result<BatchReport, DedupError> {
        let start = Instant::now();
        let now = Utc::now();
        let prepared = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.prepare(index, entry, now))
            .collect::<Result<Vec<_>, _>>()?;

        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts);

        let real_only = exclude_degenerate();
        let requests: Vec<QueryRequest> = embeddings
            .iter()
            .filter(|emb| !emb.degenerate)
            .map(|emb| QueryRequest::new(emb.vector.clone(), 1).with_filter(Some(real_only.clone())))
            .collect();
        let mut nearest = if requests.is_empty() {
            Vec::new()
        } else {
            self.vectors
                .query_batch(&requests)
                .inspect_err(|err| error!(%err, "nearest-neighbour query failed"))?
        }
        .into_iter();

        let mut report = BatchReport::default();
        let mut inserts = Vec::new();
        for (entry, embedding) in prepared.into_iter().zip(embeddings) {
            let top = if embedding.degenerate {
                None
            } else {
                nearest.next().and_then(|hits| hits.into_iter().next())
            };
            let decision = self.decide(&entry.id, top);

            let record = match &decision {
                Decision::Canonical => {
                    LookupRecord::canonical(&entry.id, entry.timestamp, entry.location.clone())
                }
                Decision::Duplicate {
                    closest_id,
                    similarity,
                } => LookupRecord::duplicate(
                    &entry.id,
                    closest_id,
                    *similarity,
                    entry.timestamp,
                    entry.location.clone(),
                ),
            };
            let lookup_written = self
                .lookups
                .insert_or_ignore(&record)
                .inspect_err(|err| error!(id = %entry.id, %err, "lookup insert failed"))?;

            if decision.is_duplicate() {
                report.duplicates += 1;
            } else {
                report.canonical += 1;
                inserts.push(into_point(entry.id.clone(), entry.payload, embedding));
            }
            report.outcomes.push(IngestOutcome {
                id: entry.id,
                decision,
                lookup_written,
            });
        }

        if !inserts.is_empty() {
            self.vectors
                .upsert(inserts)
                .inspect_err(|err| error!(%err, "vector insert failed"))?;
        }

        let latency = start.elapsed();
        if let Some(recorder) = metrics_recorder() {
            recorder.record_batch(latency, report.canonical, report.duplicates);
        }
        info!(
            entries = entries.len(),
            canonical = report.canonical,
            duplicates = report.duplicates,
            latency_ms = latency.as_millis() as u64,
            "ingested batch"
        );
        Ok(report)
    }

    fn decide(&self, id: &str, top: Option<ScoredPoint>) -> Decision {
        match top {
            Some(hit) if self.within_threshold(f64::from(hit.score)) => {
                debug!(id, closest = %hit.id, score = hit.score, "duplicate");
                Decision::Duplicate {
                    closest_id: hit.id,
                    similarity: f64::from(hit.score),
                }
            }
            Some(hit) => {
                debug!(id, closest = %hit.id, score = hit.score, "below threshold, canonical");
                Decision::Canonical
            }
            None => {
                debug!(id, "no neighbour, canonical");
                Decision::Canonical
            }
        }
    }

    /// For euclidean collections the threshold is a maximum distance.
    fn within_threshold(&self, score: f64) -> bool {
        if self.embedder.distance().higher_is_closer() {
            score >= self.cfg.insert_sim_threshold
        } else {
            score <= self.cfg.insert_sim_threshold
        }
    }

    fn prepare(
        &self,
        index: usize,
        entry: &LogEntry,
        now: DateTime<Utc>,
    ) -> Result<Prepared, DedupError> {
        let id = content_id(&entry.text, &Value::Object(entry.metadata.clone()));
        if entry.text.contains('\0') {
            return Err(DedupError::InvalidEntry {
                index,
                id,
                reason: "text contains a NUL byte".into(),
            });
        }

        let (inserted_at, insert_timestamp) = match &entry.insert_timestamp {
            Some(raw) => {
                let parsed = parse_utc(raw).ok_or_else(|| DedupError::InvalidTimestamp {
                    index,
                    field: INSERT_TIMESTAMP_KEY.to_string(),
                    value: raw.clone(),
                })?;
                (parsed, raw.clone())
            }
            None => (now, now.to_rfc3339_opts(SecondsFormat::Micros, true)),
        };

        let timestamp = match entry.metadata.get(&self.cfg.timestamp_key) {
            None | Some(Value::Null) => inserted_at,
            Some(Value::String(raw)) => {
                parse_datetime(raw).ok_or_else(|| DedupError::InvalidTimestamp {
                    index,
                    field: self.cfg.timestamp_key.clone(),
                    value: raw.clone(),
                })?
            }
            Some(other) => {
                return Err(DedupError::InvalidTimestamp {
                    index,
                    field: self.cfg.timestamp_key.clone(),
                    value: other.to_string(),
                })
            }
        };

        let location = match entry.metadata.get(&self.cfg.location_key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let mut payload = entry.metadata.clone();
        payload.insert(SIM_SYNC_KEY.to_string(), Value::Bool(false));
        payload.insert(
            INSERT_TIMESTAMP_KEY.to_string(),
            Value::String(insert_timestamp),
        );
        payload.insert(TEXT_KEY.to_string(), Value::String(entry.text.clone()));

        Ok(Prepared {
            id,
            payload,
            timestamp,
            location,
        })
    }

    /// Top-`top_k` stored entries nearest to `text`, optionally filtered.
    pub fn search(
        &self,
        text: &str,
        filters: &[Value],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, DedupError> {
        let predicate = compile_filters(filters)?;
        let embedding = self.embedder.embed(text);
        let hits = self
            .vectors
            .query(&embedding.vector, predicate.as_ref(), top_k)
            .inspect_err(|err| error!(%err, "search failed"))?;
        debug!(hits = hits.len(), "search completed");
        Ok(hits)
    }

    /// First `limit` stored entries matching `filters`.
    pub fn scroll(&self, filters: &[Value], limit: usize) -> Result<Vec<StoredPoint>, DedupError> {
        let predicate = compile_filters(filters)?;
        let points = self
            .vectors
            .scroll(predicate.as_ref(), limit, false)
            .inspect_err(|err| error!(%err, "scroll failed"))?;
        debug!(points = points.len(), "scroll completed");
        Ok(points)
    }

    /// Lookup row for `id`: the entry it was matched to and how closely.
    pub fn find_near_occurrences(&self, id: &str) -> Result<Option<LookupRecord>, DedupError> {
        Ok(self.lookups.find(id)?)
    }

    /// Embedder-native similarity between two raw texts.
    pub fn similarity(&self, a: &str, b: &str) -> Result<f64, DedupError> {
        Ok(self.embedder.compare(a, b)?)
    }

    /// Drop the collection and every lookup row.
    pub fn clear(&self) -> Result<(), DedupError> {
        self.vectors.delete_collection_if_exists()?;
        let removed = self.lookups.delete_all()?;
        info!(
            collection = self.vectors.collection(),
            lookup_rows = removed,
            "cleared vector store and lookup table"
        );
        Ok(())
    }

    /// [`clear`](Self::clear), then recreate the collection and table.
    pub fn reset(&self) -> Result<(), DedupError> {
        self.clear()?;
        self.warm_up()?;
        info!(collection = self.vectors.collection(), "reset vector store and lookup table");
        Ok(())
    }

    /// Flag the source entry of every edge as relinked.
    ///
    /// Returns the number of distinct ids flagged.
    pub fn mark_relinked(&self, edges: &[RelinkEdge]) -> Result<usize, DedupError> {
        let mut ids: Vec<&str> = edges.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(0);
        }
        let mut payload = Map::new();
        payload.insert(SIM_SYNC_KEY.to_string(), Value::Bool(true));
        self.vectors
            .set_payload_where(payload, &Predicate::has_ids(ids.iter().copied()))?;
        debug!(ids = ids.len(), "marked entries as relinked");
        Ok(ids.len())
    }

    /// Delete stored entries matching `filters`. An empty filter is refused.
    pub fn delete_where(&self, filters: &[Value]) -> Result<(), DedupError> {
        let predicate = compile_filters(filters)?.ok_or(DedupError::EmptyFilter)?;
        if predicate.is_empty() {
            return Err(DedupError::EmptyFilter);
        }
        self.vectors.delete_where(&predicate)?;
        info!(filters = filters.len(), "deleted matching entries");
        Ok(())
    }
}

/// Conjunction of `filters`, or `None` when there are none.
pub(crate) fn compile_filters(filters: &[Value]) -> Result<Option<Predicate>, DedupError> {
    if filters.is_empty() {
        return Ok(None);
    }
    Ok(Some(compile(filters, CompileMode::And)?))
}

/// Keeps featureless points out of neighbour queries.
pub(crate) fn exclude_degenerate() -> Predicate {
    Predicate {
        must_not: vec![Condition::field(
            DEGENERATE_KEY,
            FieldCheck::MatchValue(Value::Bool(true)),
        )],
        ..Predicate::default()
    }
}

fn into_point(id: String, mut payload: Payload, embedding: Embedding) -> Point {
    if embedding.degenerate {
        payload.insert(DEGENERATE_KEY.to_string(), Value::Bool(true));
    }
    Point::new(id, embedding.vector, payload)
}

/// RFC 3339 with an explicit `Z` offset.
fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if !raw.ends_with('Z') {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
