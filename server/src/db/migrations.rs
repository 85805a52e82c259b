use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Tracked with the SQLite user_version pragma.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: Key-bound metadata

CREATE TABLE metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    storage_key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
",
    )])
}
