pub mod migrations;
pub mod store;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Type alias for a shared database connection.
/// rusqlite is synchronous, so connections sit behind Arc<Mutex> and are used
/// from tokio::task::spawn_blocking.
pub type DbPool = Arc<Mutex<Connection>>;

/// Path of the metadata database inside `data_dir`.
pub fn db_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("metadata.db")
}

/// Initialize the SQLite database: create data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
///
/// Returns the connection used for writes.
pub fn init_db(data_dir: &str) -> Result<DbPool, store::StoreError> {
    // Ensure data directory exists
    std::fs::create_dir_all(data_dir)?;

    let path = db_path(data_dir);
    let mut conn = Connection::open(&path)?;

    // WAL lets the read connection run alongside the writer
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    // Run migrations
    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// Open a second connection to an already initialized database for reads.
pub fn open_read_connection(data_dir: &str) -> Result<DbPool, store::StoreError> {
    let conn = Connection::open(db_path(data_dir))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(Arc::new(Mutex::new(conn)))
}
