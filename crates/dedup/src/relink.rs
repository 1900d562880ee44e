//! Best-effort relink pass.
//!
//! Scrolls one page of entries that have not been relinked yet and finds the
//! closest *other* unsynced entry for each. Nothing is written; callers pass
//! the edges to [`DedupEngine::mark_relinked`] once they have persisted them.
//! The scroll and the queries are separate store calls with no isolation
//! between them.

use std::time::Instant;

use filter::{compile, CompileMode, Predicate};
use index::QueryRequest;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::engine::{exclude_degenerate, DedupEngine};
use crate::error::DedupError;
use crate::metrics::metrics_recorder;
use crate::types::{RelinkEdge, SIM_SYNC_KEY, TEXT_KEY};

impl DedupEngine {
    pub fn relink(&self) -> Result<Vec<RelinkEdge>, DedupError> {
        let start = Instant::now();
        let unsynced = unsynced_filter()?;
        let page = self
            .vector_store()
            .scroll(Some(&unsynced), self.config().sim_sync_batch_size, true)
            .inspect_err(|err| error!(%err, "relink scroll failed"))?;

        // Points without a stored vector are re-embedded from their text.
        let candidates: Vec<(String, Vec<f32>)> = page
            .into_iter()
            .filter_map(|point| {
                let vector = match point.vector {
                    Some(vector) => vector,
                    None => {
                        let text = point.payload.get(TEXT_KEY).and_then(Value::as_str)?;
                        self.embedder().embed(text).vector
                    }
                };
                Some((point.id, vector))
            })
            .collect();

        let requests: Vec<QueryRequest> = candidates
            .iter()
            .map(|(_, vector)| QueryRequest::new(vector.clone(), 2).with_filter(Some(unsynced.clone())))
            .collect();
        let results = if requests.is_empty() {
            Vec::new()
        } else {
            self.vector_store()
                .query_batch(&requests)
                .inspect_err(|err| error!(%err, "relink query failed"))?
        };

        let edges: Vec<RelinkEdge> = candidates
            .iter()
            .zip(results)
            .filter_map(|((id, _), hits)| {
                let neighbor = hits.into_iter().find(|hit| &hit.id != id)?;
                debug!(id = %id, neighbor = %neighbor.id, score = neighbor.score, "relink edge");
                Some(RelinkEdge {
                    id: id.clone(),
                    neighbor_id: neighbor.id,
                    similarity: f64::from(neighbor.score),
                })
            })
            .collect();

        let latency = start.elapsed();
        if let Some(recorder) = metrics_recorder() {
            recorder.record_relink(latency, candidates.len(), edges.len());
        }
        info!(
            scanned = candidates.len(),
            edges = edges.len(),
            latency_ms = latency.as_millis() as u64,
            "relink pass finished"
        );
        Ok(edges)
    }
}

/// Real entries whose `sim_sync` flag is still false.
fn unsynced_filter() -> Result<Predicate, DedupError> {
    let mut predicate = compile(
        &[json!({"key": SIM_SYNC_KEY, "dtype": "boolean", "op": "equals", "value": false})],
        CompileMode::And,
    )?;
    predicate.must_not.extend(exclude_degenerate().must_not);
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn unsynced_filter_selects_false_flags_only() {
        let filter = unsynced_filter().unwrap();
        let mut payload = Map::new();
        payload.insert(SIM_SYNC_KEY.into(), json!(false));
        assert!(filter.matches("a", &payload));

        payload.insert(SIM_SYNC_KEY.into(), json!(true));
        assert!(!filter.matches("a", &payload));

        payload.insert(SIM_SYNC_KEY.into(), json!(false));
        payload.insert(crate::types::DEGENERATE_KEY.into(), json!(true));
        assert!(!filter.matches("a", &payload));
    }
}
