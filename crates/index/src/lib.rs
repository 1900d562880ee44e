//! # logdup index
//!
//! Storage seams for the dedup pipeline. Two traits, each with an in-memory
//! implementation that is always built and a networked one behind a feature:
//!
//! - [`VectorStore`]: a single vector collection holding fingerprint vectors
//!   plus JSON payloads. Supports top-k nearest-neighbour queries, scrolls,
//!   and predicate-driven deletes and payload updates. The `qdrant` feature
//!   adds [`QdrantVectorStore`].
//! - [`LookupStore`]: provenance rows keyed by entry id, written
//!   insert-or-ignore. The `postgres` feature adds [`PostgresLookupStore`].
//!
//! Backends are picked at runtime through [`VectorBackendConfig`] and
//! [`LookupBackendConfig`]; choosing a backend whose feature is off fails at
//! `build()` time rather than at compile time.
//!
//! ```
//! use index::{Distance, InMemoryVectorStore, Point, VectorStore};
//! use serde_json::Map;
//!
//! let store = InMemoryVectorStore::new("logs");
//! store.create_collection_if_absent(2, Distance::Cosine).unwrap();
//! store
//!     .upsert(vec![Point::new("a", vec![1.0, 0.0], Map::new())])
//!     .unwrap();
//! let hits = store.query(&[1.0, 0.1], None, 1).unwrap();
//! assert_eq!(hits[0].id, "a");
//! ```

mod backend;
mod lookup;
mod memory;
mod vector;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "qdrant")]
mod qdrant;

use filter::FilterError;
use thiserror::Error;

pub use crate::backend::{LookupBackendConfig, VectorBackendConfig};
pub use crate::lookup::{InMemoryLookupStore, LookupRecord, LookupStore};
pub use crate::memory::InMemoryVectorStore;
pub use crate::vector::{
    Distance, Payload, Point, QueryRequest, ScoredPoint, StoredPoint, VectorStore,
};

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresLookupStore;
#[cfg(feature = "qdrant")]
pub use crate::qdrant::QdrantVectorStore;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("collection `{0}` does not exist")]
    CollectionNotFound(String),
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid identifier `{0}`: use ascii letters, digits and underscores")]
    InvalidIdentifier(String),
    #[error("filter conversion failed: {0}")]
    Filter(#[from] FilterError),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
