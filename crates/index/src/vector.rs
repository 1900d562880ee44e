use std::fmt;
use std::str::FromStr;

use filter::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::IndexError;

/// JSON object stored next to every vector.
pub type Payload = Map<String, Value>;

/// Distance function of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    #[default]
    Cosine,
    Euclidean,
    Dot,
}

impl Distance {
    /// Whether a larger score means a closer point.
    pub fn higher_is_closer(self) -> bool {
        !matches!(self, Distance::Euclidean)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distance::Cosine => "cosine",
            Distance::Euclidean => "euclidean",
            Distance::Dot => "dot",
        };
        f.write_str(name)
    }
}

impl FromStr for Distance {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Distance::Cosine),
            "euclidean" | "euclid" => Ok(Distance::Euclidean),
            "dot" => Ok(Distance::Dot),
            other => Err(IndexError::backend(format!("unknown distance `{other}`"))),
        }
    }
}

/// A point to write into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// A point read back by a scroll. `vector` is only filled when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Option<Vec<f32>>,
    pub payload: Payload,
}

/// A ranked query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// One entry of a batched query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub filter: Option<Predicate>,
    pub limit: usize,
}

impl QueryRequest {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            filter: None,
            limit,
        }
    }

    pub fn with_filter(mut self, filter: Option<Predicate>) -> Self {
        self.filter = filter;
        self
    }
}

/// A single named vector collection.
///
/// Implementations own the collection name; every method acts on it.
pub trait VectorStore: Send + Sync {
    /// Name of the collection this store writes to.
    fn collection(&self) -> &str;

    /// Create the collection. Returns `false` when it already existed.
    fn create_collection_if_absent(
        &self,
        vector_size: usize,
        distance: Distance,
    ) -> Result<bool, IndexError>;

    /// Drop the collection. Returns `false` when there was nothing to drop.
    fn delete_collection_if_exists(&self) -> Result<bool, IndexError>;

    /// Insert or replace points by id.
    fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError>;

    /// Top-`limit` points closest to `vector`, best first.
    fn query(
        &self,
        vector: &[f32],
        filter: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError>;

    /// Run several queries; results are returned in request order.
    fn query_batch(&self, requests: &[QueryRequest]) -> Result<Vec<Vec<ScoredPoint>>, IndexError> {
        requests
            .iter()
            .map(|req| self.query(&req.vector, req.filter.as_ref(), req.limit))
            .collect()
    }

    /// First `limit` points matching `filter`, in id order.
    fn scroll(
        &self,
        filter: Option<&Predicate>,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, IndexError>;

    fn delete_where(&self, filter: &Predicate) -> Result<(), IndexError>;

    /// Merge `payload` into every point matching `filter`.
    fn set_payload_where(&self, payload: Payload, filter: &Predicate) -> Result<(), IndexError>;

    fn count(&self, filter: Option<&Predicate>) -> Result<usize, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_parses_aliases() {
        assert_eq!("Cosine".parse::<Distance>().unwrap(), Distance::Cosine);
        assert_eq!("euclid".parse::<Distance>().unwrap(), Distance::Euclidean);
        assert!("manhattan".parse::<Distance>().is_err());
    }

    #[test]
    fn distance_serializes_snake_case() {
        let json = serde_json::to_string(&Distance::Euclidean).unwrap();
        assert_eq!(json, "\"euclidean\"");
        assert!(!Distance::Euclidean.higher_is_closer());
        assert!(Distance::Dot.higher_is_closer());
    }
}
