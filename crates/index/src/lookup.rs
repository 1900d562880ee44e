use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::IndexError;

/// Provenance row for one ingested entry.
///
/// A canonical entry points at itself with similarity `1.0`; a duplicate
/// points at the stored entry it matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRecord {
    pub id: String,
    pub closest_log_id: String,
    pub similarity: f64,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
}

impl LookupRecord {
    pub fn canonical(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        location: Option<String>,
    ) -> Self {
        let id = id.into();
        Self {
            closest_log_id: id.clone(),
            id,
            similarity: 1.0,
            timestamp,
            location,
        }
    }

    pub fn duplicate(
        id: impl Into<String>,
        closest_log_id: impl Into<String>,
        similarity: f64,
        timestamp: DateTime<Utc>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            closest_log_id: closest_log_id.into(),
            similarity,
            timestamp,
            location,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.closest_log_id == self.id && self.similarity == 1.0
    }
}

/// Relational provenance table. Rows are never updated once written.
pub trait LookupStore: Send + Sync {
    /// Create the table if it does not exist.
    fn ensure_table(&self) -> Result<(), IndexError>;

    /// Insert `record` unless a row with the same id exists. Returns whether
    /// a row was written.
    fn insert_or_ignore(&self, record: &LookupRecord) -> Result<bool, IndexError>;

    fn find(&self, id: &str) -> Result<Option<LookupRecord>, IndexError>;

    /// Delete every row, returning how many were removed.
    fn delete_all(&self) -> Result<usize, IndexError>;
}

/// Lookup table held in a `RwLock`ed `HashMap`.
#[derive(Default)]
pub struct InMemoryLookupStore {
    rows: RwLock<HashMap<String, LookupRecord>>,
}

impl InMemoryLookupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LookupStore for InMemoryLookupStore {
    fn ensure_table(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn insert_or_ignore(&self, record: &LookupRecord) -> Result<bool, IndexError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if rows.contains_key(&record.id) {
            return Ok(false);
        }
        rows.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    fn find(&self, id: &str) -> Result<Option<LookupRecord>, IndexError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(rows.get(id).cloned())
    }

    fn delete_all(&self) -> Result<usize, IndexError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let removed = rows.len();
        rows.clear();
        Ok(removed)
    }
}
