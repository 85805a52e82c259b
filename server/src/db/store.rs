//! Metadata persistence: one latest value per storage key.
//!
//! The store wraps a backend engine and decides once, at startup, whether each
//! write must first pin the session to read-your-write consistency. That
//! override only matters for primary/replica engines whose replicas can lag.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),
    #[error("database I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Replication layout of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    SingleNode,
    Replicated,
}

/// Configured consistency policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Decide from the backend topology and the write endpoint.
    #[default]
    Auto,
    /// Always issue the session override before writing.
    Session,
    /// Never issue it.
    Synchronous,
}

/// Resolved behaviour of the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyRouting {
    /// Replication is synchronous by topology; write directly.
    Synchronous,
    /// Pin the session to read its own writes before each upsert.
    SessionOverride,
}

impl ConsistencyRouting {
    /// Resolve the routing for a backend.
    ///
    /// In `Auto` mode a replicated backend skips the override only when its
    /// write endpoint matches one of `synchronous_endpoints`.
    pub fn resolve(
        mode: ConsistencyMode,
        topology: Topology,
        write_endpoint: &str,
        synchronous_endpoints: &[String],
    ) -> Self {
        match mode {
            ConsistencyMode::Session => ConsistencyRouting::SessionOverride,
            ConsistencyMode::Synchronous => ConsistencyRouting::Synchronous,
            ConsistencyMode::Auto => match topology {
                Topology::SingleNode => ConsistencyRouting::Synchronous,
                Topology::Replicated => {
                    let synchronous = synchronous_endpoints
                        .iter()
                        .filter(|p| !p.is_empty())
                        .any(|p| write_endpoint.contains(p.as_str()));
                    if synchronous {
                        ConsistencyRouting::Synchronous
                    } else {
                        ConsistencyRouting::SessionOverride
                    }
                }
            },
        }
    }
}

/// Storage engine contract. Calls are blocking; run them on
/// `spawn_blocking` from async code.
pub trait MetadataBackend: Send + Sync {
    fn topology(&self) -> Topology;

    /// Identifier of the write endpoint, matched against configured
    /// synchronous endpoints.
    fn write_endpoint(&self) -> String;

    /// Make subsequent reads observe this session's writes.
    fn enforce_session_consistency(&self) -> Result<(), StoreError>;

    /// Insert or replace the value for `key` in one atomic statement.
    fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// SQLite backend with separate write and read connections.
pub struct SqliteBackend {
    write: DbPool,
    read: DbPool,
    path: String,
}

impl SqliteBackend {
    pub fn open(data_dir: &str) -> Result<Self, StoreError> {
        let write = super::init_db(data_dir)?;
        let read = super::open_read_connection(data_dir)?;
        Ok(Self {
            write,
            read,
            path: super::db_path(data_dir).display().to_string(),
        })
    }
}

impl MetadataBackend for SqliteBackend {
    fn topology(&self) -> Topology {
        Topology::SingleNode
    }

    fn write_endpoint(&self) -> String {
        self.path.clone()
    }

    fn enforce_session_consistency(&self) -> Result<(), StoreError> {
        // Committed WAL frames are visible to the next read transaction on
        // any connection.
        Ok(())
    }

    fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.write.lock().map_err(|_| StoreError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO metadata (storage_key, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(storage_key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        tracing::debug!("Upserted metadata row ({} bytes)", value.len());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        use rusqlite::OptionalExtension;

        let conn = self.read.lock().map_err(|_| StoreError::LockPoisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM metadata WHERE storage_key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Metadata store with consistency routing applied.
#[derive(Clone)]
pub struct MetadataStore {
    backend: Arc<dyn MetadataBackend>,
    routing: ConsistencyRouting,
}

impl MetadataStore {
    pub fn new(backend: Arc<dyn MetadataBackend>, routing: ConsistencyRouting) -> Self {
        Self { backend, routing }
    }

    pub fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.routing == ConsistencyRouting::SessionOverride {
            self.backend.enforce_session_consistency()?;
        }
        self.backend.upsert(key, value)
    }

    /// Stored value, or `""` when the key has never been written.
    pub fn get(&self, key: &str) -> Result<String, StoreError> {
        Ok(self.backend.get(key)?.unwrap_or_default())
    }
}
