use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use filter::Predicate;
use tracing::debug;

use crate::vector::{Distance, Payload, Point, ScoredPoint, StoredPoint, VectorStore};
use crate::IndexError;

struct Collection {
    vector_size: usize,
    distance: Distance,
    points: BTreeMap<String, (Vec<f32>, Payload)>,
}

/// A vector collection held in a `RwLock`ed `BTreeMap`.
///
/// Queries are exact brute-force scans, so scores match the distance
/// definitions exactly. Useful for tests and single-process runs.
pub struct InMemoryVectorStore {
    name: String,
    inner: RwLock<Option<Collection>>,
}

impl InMemoryVectorStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(None),
        }
    }

    fn missing(&self) -> IndexError {
        IndexError::CollectionNotFound(self.name.clone())
    }
}

impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.name
    }

    fn create_collection_if_absent(
        &self,
        vector_size: usize,
        distance: Distance,
    ) -> Result<bool, IndexError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if guard.is_some() {
            return Ok(false);
        }
        *guard = Some(Collection {
            vector_size,
            distance,
            points: BTreeMap::new(),
        });
        debug!(collection = %self.name, vector_size, %distance, "created in-memory collection");
        Ok(true)
    }

    fn delete_collection_if_exists(&self) -> Result<bool, IndexError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.take().is_some())
    }

    fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;
        // Check every dimension before writing any point.
        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() != collection.vector_size)
        {
            return Err(IndexError::DimensionMismatch {
                expected: collection.vector_size,
                actual: bad.vector.len(),
            });
        }
        for point in points {
            collection
                .points
                .insert(point.id, (point.vector, point.payload));
        }
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        filter: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_ref().ok_or_else(|| self.missing())?;
        if vector.len() != collection.vector_size {
            return Err(IndexError::DimensionMismatch {
                expected: collection.vector_size,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter(|(id, (_, payload))| filter.map_or(true, |f| f.matches(id, payload)))
            .map(|(id, (stored, payload))| ScoredPoint {
                id: id.clone(),
                score: score(collection.distance, vector, stored),
                payload: payload.clone(),
            })
            .collect();

        let higher_is_closer = collection.distance.higher_is_closer();
        hits.sort_by(|a, b| {
            let by_score = if higher_is_closer {
                b.score.partial_cmp(&a.score)
            } else {
                a.score.partial_cmp(&b.score)
            };
            by_score
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn scroll(
        &self,
        filter: Option<&Predicate>,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, IndexError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_ref().ok_or_else(|| self.missing())?;
        Ok(collection
            .points
            .iter()
            .filter(|(id, (_, payload))| filter.map_or(true, |f| f.matches(id, payload)))
            .take(limit)
            .map(|(id, (vector, payload))| StoredPoint {
                id: id.clone(),
                vector: with_vectors.then(|| vector.clone()),
                payload: payload.clone(),
            })
            .collect())
    }

    fn delete_where(&self, filter: &Predicate) -> Result<(), IndexError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;
        collection
            .points
            .retain(|id, (_, payload)| !filter.matches(id, payload));
        Ok(())
    }

    fn set_payload_where(&self, payload: Payload, filter: &Predicate) -> Result<(), IndexError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;
        for (id, (_, existing)) in collection.points.iter_mut() {
            if filter.matches(id, existing) {
                for (key, value) in &payload {
                    existing.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn count(&self, filter: Option<&Predicate>) -> Result<usize, IndexError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let collection = guard.as_ref().ok_or_else(|| self.missing())?;
        Ok(collection
            .points
            .iter()
            .filter(|(id, (_, payload))| filter.map_or(true, |f| f.matches(id, payload)))
            .count())
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    match distance {
        Distance::Dot => dot as f32,
        Distance::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| {
                let d = f64::from(*x) - f64::from(*y);
                d * d
            })
            .sum::<f64>()
            .sqrt() as f32,
        Distance::Cosine => {
            let na: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
            let nb: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                (dot / (na * nb)) as f32
            }
        }
    }
}
