use std::sync::Mutex;

use chrono::NaiveDateTime;
use postgres::{Client, Config, NoTls};
use tracing::{debug, info};

use crate::lookup::{LookupRecord, LookupStore};
use crate::IndexError;

/// Lookup store backed by a PostgreSQL table.
///
/// Timestamps are stored as `TIMESTAMP` (no zone) in UTC.
pub struct PostgresLookupStore {
    client: Mutex<Client>,
    table: String,
}

impl PostgresLookupStore {
    pub fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: Option<&str>,
        database: &str,
        table: &str,
    ) -> Result<Self, IndexError> {
        if !valid_identifier(table) {
            return Err(IndexError::InvalidIdentifier(table.to_string()));
        }
        let mut config = Config::new();
        config.host(host).port(port).user(user).dbname(database);
        if let Some(password) = password {
            config.password(password);
        }
        let client = config.connect(NoTls).map_err(IndexError::backend)?;
        info!(host, port, database, table, "connected to postgres lookup store");
        Ok(Self {
            client: Mutex::new(client),
            table: table.to_string(),
        })
    }

    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T, IndexError> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        f(&mut client).map_err(IndexError::backend)
    }
}

impl LookupStore for PostgresLookupStore {
    fn ensure_table(&self) -> Result<(), IndexError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id TEXT PRIMARY KEY, \
             closest_log_id TEXT NOT NULL, \
             similarity FLOAT NOT NULL, \
             timestamp TIMESTAMP NOT NULL, \
             location TEXT)",
            self.table
        );
        self.with_client(|client| client.batch_execute(&ddl))
    }

    fn insert_or_ignore(&self, record: &LookupRecord) -> Result<bool, IndexError> {
        let sql = format!(
            "INSERT INTO {} (id, closest_log_id, similarity, timestamp, location) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO NOTHING",
            self.table
        );
        let timestamp: NaiveDateTime = record.timestamp.naive_utc();
        let written = self.with_client(|client| {
            client.execute(
                &sql,
                &[
                    &record.id,
                    &record.closest_log_id,
                    &record.similarity,
                    &timestamp,
                    &record.location,
                ],
            )
        })?;
        debug!(id = %record.id, written, "lookup insert");
        Ok(written > 0)
    }

    fn find(&self, id: &str) -> Result<Option<LookupRecord>, IndexError> {
        let sql = format!(
            "SELECT id, closest_log_id, similarity, timestamp, location FROM {} WHERE id = $1",
            self.table
        );
        let row = self.with_client(|client| client.query_opt(&sql, &[&id]))?;
        row.map(|row| -> Result<LookupRecord, IndexError> {
            let timestamp: NaiveDateTime = row.try_get(3).map_err(IndexError::backend)?;
            Ok(LookupRecord {
                id: row.try_get(0).map_err(IndexError::backend)?,
                closest_log_id: row.try_get(1).map_err(IndexError::backend)?,
                similarity: row.try_get(2).map_err(IndexError::backend)?,
                timestamp: timestamp.and_utc(),
                location: row.try_get(4).map_err(IndexError::backend)?,
            })
        })
        .transpose()
    }

    fn delete_all(&self) -> Result<usize, IndexError> {
        let sql = format!("DELETE FROM {}", self.table);
        let removed = self.with_client(|client| client.execute(&sql, &[]))?;
        Ok(removed as usize)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(valid_identifier("log_lookup"));
        assert!(valid_identifier("_t1"));
        assert!(!valid_identifier("1table"));
        assert!(!valid_identifier("logs; DROP TABLE x"));
        assert!(!valid_identifier(""));
    }
}
