//! SQLite storage engine — schema, pragmas, and typed operations.
//!
//! This module owns the on-disk database. [`open_database`] opens or creates
//! the file, applies the session pragmas, installs the schema, and rebuilds
//! the journal FTS index. The submodules expose the typed operations:
//! [`entity`], [`observation`], [`relation`], [`journal`], and [`search`].
//!
//! Exactly one connection exists per database. SQLite serializes writes
//! anyway; sharing the single handle also serializes reads, so callers must
//! never hold a result cursor open while issuing another query (see
//! `search::attach_observations`).

pub mod entity;
pub mod journal;
pub mod observation;
pub mod relation;
pub mod schema;
pub mod search;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the aimemo database at the given path with all session
/// settings applied and the schema initialized.
///
/// Session settings, applied once per connection:
/// - WAL journaling for concurrent-read friendliness
/// - foreign keys on (hard delete cascades depend on it)
/// - `synchronous=NORMAL` for throughput
/// - 64 MB page cache
/// - 5 s busy timeout for contended waits
///
/// A failure to apply any pragma is reported as a distinguished open error
/// rather than letting later operations degrade silently.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    apply_pragmas(&conn)
        .with_context(|| format!("failed to apply session settings for {}", path.display()))?;

    register_functions(&conn).context("failed to register SQL functions")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    schema::rebuild_journal_fts(&conn).context("failed to rebuild journal index")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", "-64000")?;
    conn.pragma_update(None, "busy_timeout", "5000")?;
    Ok(())
}

/// Register SQL scalar functions relied on by search ranking queries.
///
/// The bundled SQLite build is compiled without `SQLITE_ENABLE_MATH_FUNCTIONS`,
/// so `LN` is registered here to match the builtin's semantics.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "LN",
        1,
        FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: f64 = ctx.get(0)?;
            Ok(value.ln())
        },
    )
}

/// Current unix time in milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Open an in-memory database for testing.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(&conn).context("failed to register SQL functions")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    schema::rebuild_journal_fts(&conn).context("failed to rebuild journal index")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_database_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.db");

        let conn = open_database(&path).unwrap();
        assert!(path.exists());

        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");

        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn open_database_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");

        drop(open_database(&path).unwrap());
        drop(open_database(&path).unwrap());
    }

    #[test]
    fn rebuild_indexes_preexisting_journal_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");

        {
            let conn = open_database(&path).unwrap();
            journal::append_journal(&conn, "Pre-existing session log entry", &[]).unwrap();
        }

        // Reopen: the rebuild step must index the existing row.
        let conn = open_database(&path).unwrap();
        let results = journal::search_journal(&conn, "session", 10).unwrap();
        assert_eq!(results.len(), 1);
    }
}
