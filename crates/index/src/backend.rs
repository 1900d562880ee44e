use serde::{Deserialize, Serialize};

use crate::lookup::{InMemoryLookupStore, LookupStore};
use crate::memory::InMemoryVectorStore;
use crate::vector::VectorStore;
use crate::IndexError;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresLookupStore;
#[cfg(feature = "qdrant")]
use crate::qdrant::QdrantVectorStore;

/// Selects and builds a [`VectorStore`].
///
/// ```
/// use index::VectorBackendConfig;
///
/// let store = VectorBackendConfig::in_memory("logs").build().unwrap();
/// assert_eq!(store.collection(), "logs");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum VectorBackendConfig {
    InMemory {
        collection: String,
    },
    /// Requires the `qdrant` feature.
    Qdrant {
        url: String,
        collection: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl Default for VectorBackendConfig {
    fn default() -> Self {
        Self::in_memory("logs")
    }
}

impl VectorBackendConfig {
    pub fn in_memory(collection: impl Into<String>) -> Self {
        VectorBackendConfig::InMemory {
            collection: collection.into(),
        }
    }

    pub fn qdrant(url: impl Into<String>, collection: impl Into<String>) -> Self {
        VectorBackendConfig::Qdrant {
            url: url.into(),
            collection: collection.into(),
            api_key: None,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            VectorBackendConfig::InMemory { collection }
            | VectorBackendConfig::Qdrant { collection, .. } => collection,
        }
    }

    pub fn build(&self) -> Result<Box<dyn VectorStore>, IndexError> {
        match self {
            VectorBackendConfig::InMemory { collection } => {
                Ok(Box::new(InMemoryVectorStore::new(collection.clone())))
            }
            VectorBackendConfig::Qdrant {
                url,
                collection,
                api_key,
            } => {
                #[cfg(feature = "qdrant")]
                {
                    Ok(Box::new(QdrantVectorStore::connect(
                        url,
                        collection.clone(),
                        api_key.clone(),
                    )?))
                }
                #[cfg(not(feature = "qdrant"))]
                {
                    let _ = (url, collection, api_key);
                    Err(IndexError::backend("qdrant backend disabled at compile time"))
                }
            }
        }
    }
}

/// Selects and builds a [`LookupStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LookupBackendConfig {
    #[default]
    InMemory,
    /// Requires the `postgres` feature.
    Postgres {
        host: String,
        #[serde(default = "default_pg_port")]
        port: u16,
        user: String,
        #[serde(default)]
        password: Option<String>,
        database: String,
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_pg_port() -> u16 {
    5432
}

fn default_table() -> String {
    "log_lookup".to_string()
}

impl LookupBackendConfig {
    pub fn in_memory() -> Self {
        LookupBackendConfig::InMemory
    }

    pub fn build(&self) -> Result<Box<dyn LookupStore>, IndexError> {
        match self {
            LookupBackendConfig::InMemory => Ok(Box::new(InMemoryLookupStore::new())),
            LookupBackendConfig::Postgres {
                host,
                port,
                user,
                password,
                database,
                table,
            } => {
                #[cfg(feature = "postgres")]
                {
                    Ok(Box::new(PostgresLookupStore::connect(
                        host,
                        *port,
                        user,
                        password.as_deref(),
                        database,
                        table,
                    )?))
                }
                #[cfg(not(feature = "postgres"))]
                {
                    let _ = (host, port, user, password, database, table);
                    Err(IndexError::backend("postgres backend disabled at compile time"))
                }
            }
        }
    }
}
