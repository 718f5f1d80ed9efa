//! Journal operations — append-only timestamped entries with time-windowed
//! listing and full-text search, plus the time-window expression parser.
//!
//! Journal entries are never deduplicated: appending identical content twice
//! yields two rows.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::observation::MAX_CONTENT_BYTES;
use crate::db::search::fts_escape;

/// A single timestamped log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: i64,
}

fn journal_from_row(row: &Row) -> rusqlite::Result<JournalEntry> {
    let tags_json: String = row.get(2)?;
    Ok(JournalEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: row.get(3)?,
    })
}

/// Append a journal entry and return the stored row.
pub fn append_journal(conn: &Connection, content: &str, tags: &[String]) -> Result<JournalEntry> {
    if content.len() > MAX_CONTENT_BYTES {
        bail!("journal content exceeds 10KB limit");
    }
    let tags_json = serde_json::to_string(tags).context("encode tags")?;

    conn.execute(
        "INSERT INTO journal (content, tags) VALUES (?1, ?2)",
        params![content, tags_json],
    )?;
    let id = conn.last_insert_rowid();

    let entry = conn.query_row(
        "SELECT id, content, tags, created_at FROM journal WHERE id = ?1",
        params![id],
        journal_from_row,
    )?;
    Ok(entry)
}

/// Parse a time-window expression into a unix-millisecond floor.
///
/// Accepted forms: empty (24 hours ago), `<N>h`, `<N>d`, or a local-time ISO
/// date `YYYY-MM-DD`. Anything else fails with a message listing the forms.
pub fn parse_since(s: &str) -> Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok((Utc::now() - Duration::hours(24)).timestamp_millis());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("construct local midnight")?;
        let local = Local
            .from_local_datetime(&midnight)
            .earliest()
            .with_context(|| format!("ambiguous local time for {s:?}"))?;
        return Ok(local.timestamp_millis());
    }

    if let Some(days) = s.strip_suffix('d') {
        if let Ok(days) = days.parse::<i64>() {
            return Ok((Utc::now() - Duration::days(days)).timestamp_millis());
        }
    }
    if let Some(hours) = s.strip_suffix('h') {
        if let Ok(hours) = hours.parse::<i64>() {
            return Ok((Utc::now() - Duration::hours(hours)).timestamp_millis());
        }
    }

    bail!("cannot parse since {s:?}: use formats like '2h', '24h', '7d', or '2026-02-17'")
}

/// List journal entries, newest first. A non-empty `since` expression bounds
/// the window; an empty one means no lower bound. Limit defaults to 50.
pub fn list_journal(conn: &Connection, since: &str, limit: i64) -> Result<Vec<JournalEntry>> {
    let limit = if limit <= 0 { 50 } else { limit };

    let mut entries = Vec::new();
    if since.is_empty() {
        let mut stmt = conn.prepare(
            "SELECT id, content, tags, created_at FROM journal
             ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], journal_from_row)?;
        for row in rows {
            entries.push(row?);
        }
    } else {
        let since_ms = parse_since(since)?;
        let mut stmt = conn.prepare(
            "SELECT id, content, tags, created_at FROM journal
             WHERE created_at >= ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![since_ms, limit], journal_from_row)?;
        for row in rows {
            entries.push(row?);
        }
    }
    Ok(entries)
}

/// Full-text search over journal content, newest first.
pub fn search_journal(conn: &Connection, query: &str, limit: i64) -> Result<Vec<JournalEntry>> {
    let limit = if limit <= 0 { 10 } else { limit };
    let escaped = fts_escape(query);

    let mut stmt = conn
        .prepare(
            "SELECT j.id, j.content, j.tags, j.created_at
             FROM journal j
             WHERE j.id IN (SELECT rowid FROM journal_fts WHERE journal_fts MATCH ?1)
             ORDER BY j.created_at DESC
             LIMIT ?2",
        )
        .context("journal search")?;
    let entries = stmt
        .query_map(params![escaped, limit], journal_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn append_never_dedups() {
        let conn = open_memory_database().unwrap();
        let e1 = append_journal(&conn, "Fixed auth bug", &["fix".into(), "auth".into()]).unwrap();
        assert!(e1.id > 0);
        assert_eq!(e1.tags, vec!["fix", "auth"]);

        let e2 = append_journal(&conn, "Fixed auth bug", &[]).unwrap();
        assert_ne!(e1.id, e2.id);

        let entries = list_journal(&conn, "", 50).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn content_size_bound() {
        let conn = open_memory_database().unwrap();
        assert!(append_journal(&conn, &"x".repeat(10240), &[]).is_ok());
        assert!(append_journal(&conn, &"y".repeat(10241), &[]).is_err());
    }

    #[test]
    fn list_newest_first_with_window() {
        let conn = open_memory_database().unwrap();
        append_journal(&conn, "first", &[]).unwrap();
        append_journal(&conn, "second", &[]).unwrap();

        // Backdate the first entry far outside any window.
        conn.execute("UPDATE journal SET created_at = 1000 WHERE content = 'first'", [])
            .unwrap();

        let entries = list_journal(&conn, "24h", 50).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "second");

        // Empty window means no lower bound.
        let entries = list_journal(&conn, "", 50).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "second");
    }

    #[test]
    fn search_matches_content() {
        let conn = open_memory_database().unwrap();
        append_journal(&conn, "Fixed the authentication bug in login flow", &[]).unwrap();
        append_journal(&conn, "Refactored Redis connection pool", &[]).unwrap();
        append_journal(&conn, "Deployed new feature to production", &[]).unwrap();

        let results = search_journal(&conn, "authentication", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("authentication"));

        let results = search_journal(&conn, "Redis", 10).unwrap();
        assert_eq!(results.len(), 1);

        let results = search_journal(&conn, "nonexistent", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn parse_since_forms() {
        let now = Utc::now().timestamp_millis();

        let floor = parse_since("").unwrap();
        assert!(floor < now && floor > now - 25 * 3_600_000);

        let floor = parse_since("2h").unwrap();
        assert!(floor < now && floor > now - 3 * 3_600_000);

        let floor = parse_since("7d").unwrap();
        assert!(floor < now - 6 * 24 * 3_600_000);

        assert!(parse_since("2026-02-17").unwrap() > 0);
        assert!(parse_since("bogus").is_err());
        assert!(parse_since("12x").is_err());
    }
}
