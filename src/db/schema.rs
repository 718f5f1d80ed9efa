//! SQL DDL for all aimemo tables.
//!
//! Defines the `entities`, `observations`, `relations`, and `journal` base
//! tables plus their FTS5 mirrors (`entities_fts`, `observations_fts`,
//! `journal_fts`) and the triggers that keep the mirrors in sync. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for aimemo's tables, indexes, and triggers.
///
/// Timestamps are unix milliseconds stored as 64-bit integers. Tag lists are
/// stored as a canonical JSON text array. The FTS5 tables are external-content
/// tables over their base tables, tokenized with `porter unicode61` so lookups
/// stem and case-fold.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT    NOT NULL,
    entity_type   TEXT    NOT NULL DEFAULT 'concept',
    tags          TEXT    NOT NULL DEFAULT '[]',
    created_at    INTEGER NOT NULL DEFAULT (unixepoch('now', 'subsec') * 1000),
    updated_at    INTEGER NOT NULL DEFAULT (unixepoch('now', 'subsec') * 1000),
    deleted_at    INTEGER,
    access_count  INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER,
    UNIQUE(name)
);

CREATE TABLE IF NOT EXISTS observations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id   INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    content     TEXT    NOT NULL,
    created_at  INTEGER NOT NULL DEFAULT (unixepoch('now', 'subsec') * 1000),
    UNIQUE(entity_id, content)
);

CREATE TABLE IF NOT EXISTS relations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    from_id     INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    to_id       INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    relation    TEXT    NOT NULL,
    created_at  INTEGER NOT NULL DEFAULT (unixepoch('now', 'subsec') * 1000),
    UNIQUE(from_id, to_id, relation)
);

CREATE TABLE IF NOT EXISTS journal (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    content    TEXT    NOT NULL,
    tags       TEXT    NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL DEFAULT (unixepoch('now', 'subsec') * 1000)
);

CREATE INDEX IF NOT EXISTS idx_journal_created ON journal(created_at DESC);

CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    name,
    entity_type,
    content='entities',
    content_rowid='id',
    tokenize='porter unicode61'
);

CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
    content,
    content='observations',
    content_rowid='id',
    tokenize='porter unicode61'
);

CREATE VIRTUAL TABLE IF NOT EXISTS journal_fts USING fts5(
    content,
    content='journal',
    content_rowid='id',
    tokenize='porter unicode61'
);

-- Entity index holds live rows only: soft delete removes the row from the
-- index, soft restore re-adds it, hard delete propagates via the delete
-- trigger.
CREATE TRIGGER IF NOT EXISTS entities_fts_insert AFTER INSERT ON entities BEGIN
    INSERT INTO entities_fts(rowid, name, entity_type) VALUES (new.id, new.name, new.entity_type);
END;

CREATE TRIGGER IF NOT EXISTS entities_fts_delete AFTER DELETE ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type) VALUES('delete', old.id, old.name, old.entity_type);
END;

CREATE TRIGGER IF NOT EXISTS entities_fts_update AFTER UPDATE OF name, entity_type ON entities
WHEN old.deleted_at IS NULL AND new.deleted_at IS NULL BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type) VALUES('delete', old.id, old.name, old.entity_type);
    INSERT INTO entities_fts(rowid, name, entity_type) VALUES (new.id, new.name, new.entity_type);
END;

CREATE TRIGGER IF NOT EXISTS entities_fts_soft_delete AFTER UPDATE OF deleted_at ON entities
WHEN old.deleted_at IS NULL AND new.deleted_at IS NOT NULL BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type) VALUES('delete', old.id, old.name, old.entity_type);
END;

CREATE TRIGGER IF NOT EXISTS entities_fts_soft_restore AFTER UPDATE OF deleted_at ON entities
WHEN old.deleted_at IS NOT NULL AND new.deleted_at IS NULL BEGIN
    INSERT INTO entities_fts(rowid, name, entity_type) VALUES (new.id, new.name, new.entity_type);
END;

-- Observation index rows follow observation rows only; soft-deleting the
-- owning entity leaves them in place.
CREATE TRIGGER IF NOT EXISTS observations_fts_insert AFTER INSERT ON observations BEGIN
    INSERT INTO observations_fts(rowid, content) VALUES (new.id, new.content);
END;

CREATE TRIGGER IF NOT EXISTS observations_fts_delete AFTER DELETE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, content) VALUES('delete', old.id, old.content);
END;

CREATE TRIGGER IF NOT EXISTS journal_fts_insert AFTER INSERT ON journal BEGIN
    INSERT INTO journal_fts(rowid, content) VALUES (new.id, new.content);
END;

CREATE TRIGGER IF NOT EXISTS journal_fts_delete AFTER DELETE ON journal BEGIN
    INSERT INTO journal_fts(journal_fts, rowid, content) VALUES('delete', old.id, old.content);
END;
"#;

/// Initialize all tables, indexes, and triggers. Idempotent.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Rebuild the journal FTS index so rows inserted before `journal_fts`
/// existed become searchable. On a fresh database this is a no-op, which
/// keeps the migration idempotent.
pub fn rebuild_journal_fts(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("INSERT INTO journal_fts(journal_fts) VALUES('rebuild')", [])?;
    Ok(())
}
