//! Unified ranked search over entities and observations, plus store
//! statistics.
//!
//! A non-empty query is matched against the entity and observation FTS
//! indexes; candidates are ranked by an importance score combining recency
//! and access count. An empty query lists all live entities under the
//! requested sort order. Filters (entity type, conjunctive tag set) apply to
//! both paths.

use anyhow::{Context, Result};
use rusqlite::types::ToSql;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::entity::{entity_from_row, Entity};
use crate::db::observation::list_observations;

/// An entity hit with its search score. Zero for list-all results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub entity: Entity,
    pub score: f64,
}

/// Escape a user query for FTS5 by passing it as a single quoted phrase.
/// Internal double quotes are doubled, which neutralizes the MATCH operator
/// syntax entirely.
pub fn fts_escape(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return String::new();
    }
    format!("\"{}\"", query.replace('"', "\"\""))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Ranked FTS search across entities and observations. An empty query lists
/// all live entities instead. `limit <= 0` falls back to 10; enforcing a
/// maximum is the caller's responsibility.
///
/// With a query present the `sort` parameter is ignored: results are ordered
/// by importance score descending, ties broken by engine row order.
pub fn search(
    conn: &Connection,
    query: &str,
    entity_type: &str,
    tags: &[String],
    sort: &str,
    limit: i64,
) -> Result<Vec<SearchResult>> {
    let limit = if limit <= 0 { 10 } else { limit };

    if query.is_empty() {
        return list_all(conn, entity_type, tags, sort, limit);
    }

    let escaped = fts_escape(query);
    // bm25() inside CTEs is unreliable across SQLite builds; find matching
    // entity ids via IN-subqueries and rank by the importance score instead.
    let mut sql = String::from(
        "SELECT DISTINCT
             e.id, e.name, e.entity_type, e.tags, e.created_at, e.updated_at, e.deleted_at,
             e.access_count, e.last_accessed,
             (0.6 / LN(((unixepoch('now') * 1000 - e.updated_at) / 3600000.0) + 2)
              + 0.4 * LN(e.access_count + 1)) AS importance_rank
         FROM entities e
         WHERE e.deleted_at IS NULL
           AND (
             e.id IN (SELECT rowid FROM entities_fts WHERE entities_fts MATCH ?)
             OR e.id IN (
                 SELECT o.entity_id FROM observations o
                 WHERE o.id IN (SELECT rowid FROM observations_fts WHERE observations_fts MATCH ?)
             )
           )",
    );
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(escaped.clone()), Box::new(escaped)];

    push_filters(&mut sql, &mut args, entity_type, tags);

    sql.push_str(" ORDER BY importance_rank DESC LIMIT ?");
    args.push(Box::new(limit));

    run_search(conn, &sql, &args).context("search query")
}

/// List all live entities under the given sort order:
/// `recent` (default) by update time, `accessed` by last access with nulls
/// last, `name` alphabetically.
fn list_all(
    conn: &Connection,
    entity_type: &str,
    tags: &[String],
    sort: &str,
    limit: i64,
) -> Result<Vec<SearchResult>> {
    let order_by = match sort {
        "accessed" => "COALESCE(e.last_accessed, 0) DESC",
        "name" => "e.name ASC",
        _ => "e.updated_at DESC",
    };

    let mut sql = String::from(
        "SELECT DISTINCT
             e.id, e.name, e.entity_type, e.tags, e.created_at, e.updated_at, e.deleted_at,
             e.access_count, e.last_accessed, 0.0 AS importance_rank
         FROM entities e
         WHERE e.deleted_at IS NULL",
    );
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    push_filters(&mut sql, &mut args, entity_type, tags);

    sql.push_str(&format!(" ORDER BY {order_by} LIMIT ?"));
    args.push(Box::new(limit));

    run_search(conn, &sql, &args)
}

/// Append the shared entity-type and conjunctive tag filters.
fn push_filters(sql: &mut String, args: &mut Vec<Box<dyn ToSql>>, entity_type: &str, tags: &[String]) {
    if !entity_type.is_empty() {
        sql.push_str(" AND e.entity_type = ?");
        args.push(Box::new(entity_type.to_string()));
    }
    if !tags.is_empty() {
        // Every requested tag must be present on the entity.
        sql.push_str(&format!(
            " AND (SELECT COUNT(*) FROM json_each(e.tags) WHERE value IN ({})) = {}",
            placeholders(tags.len()),
            tags.len()
        ));
        for tag in tags {
            args.push(Box::new(tag.clone()));
        }
    }
}

/// Execute a search query and attach observations.
///
/// All rows are scanned and the statement dropped before the second pass
/// loads observations: on the single shared handle, a nested query under an
/// open cursor deadlocks.
fn run_search(conn: &Connection, sql: &str, args: &[Box<dyn ToSql>]) -> Result<Vec<SearchResult>> {
    let mut results = {
        let params: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            let entity = entity_from_row(row)?;
            let score: f64 = row.get(9)?;
            Ok(SearchResult { entity, score })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    for result in &mut results {
        result.entity.observations = list_observations(conn, result.entity.id)?;
    }
    Ok(results)
}

/// Counts of live entities, observations, relations, and journal entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub entity_count: i64,
    pub observation_count: i64,
    pub relation_count: i64,
    pub journal_count: i64,
    #[serde(default)]
    pub storage_path: String,
}

/// Compute store statistics. Soft-deleted entities, their observations, and
/// edges with a non-live endpoint are excluded; the journal counts every row.
/// `storage_path` is left empty for the caller to fill.
pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM entities WHERE deleted_at IS NULL),
            (SELECT COUNT(*) FROM observations o
               JOIN entities e ON o.entity_id = e.id WHERE e.deleted_at IS NULL),
            (SELECT COUNT(*) FROM relations r
               JOIN entities fe ON r.from_id = fe.id
               JOIN entities te ON r.to_id = te.id
               WHERE fe.deleted_at IS NULL AND te.deleted_at IS NULL),
            (SELECT COUNT(*) FROM journal)",
        [],
        |row| {
            Ok(Stats {
                entity_count: row.get(0)?,
                observation_count: row.get(1)?,
                relation_count: row.get(2)?,
                journal_count: row.get(3)?,
                storage_path: String::new(),
            })
        },
    )?;
    Ok(stats)
}

/// All distinct tag values across live entities, sorted.
pub fn distinct_tags(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT value FROM entities, json_each(entities.tags)
         WHERE deleted_at IS NULL ORDER BY value",
    )?;
    let tags = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tags)
}
