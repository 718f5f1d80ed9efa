//! The `memory_context` tool — a cheap orientation snapshot for session
//! start.
//!
//! Issues its four sub-queries concurrently. Each acquires and releases the
//! shared handle independently, so this is safe under the single-writer
//! discipline; under heavy load contention simply serializes them.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::{journal, search};
use crate::mcp::server::Server;

#[derive(Debug, Deserialize)]
struct ContextArgs {
    #[serde(default)]
    since: String,
    #[serde(default)]
    limit: i64,
}

/// A flattened observation for the orientation snapshot.
#[derive(Debug, Serialize)]
struct RecentObservation {
    entity_name: String,
    content: String,
    created_at: i64,
}

/// Build the orientation snapshot: storage path, live counts, recent
/// observations in the window, top entities by recency, and recent journal
/// entries.
pub(crate) async fn memory_context(server: &Server, args: Value) -> Result<Value> {
    let args: ContextArgs = serde_json::from_value(args).context("invalid params")?;
    let limit = if args.limit <= 0 { 20 } else { args.limit };
    let since = if args.since.is_empty() {
        "24h".to_string()
    } else {
        args.since
    };

    let obs_since = since.clone();
    let journal_since = since;
    let (recent_obs, top_entities, stats, recent_journal) = tokio::join!(
        server.with_db(move |conn| recent_observations(conn, &obs_since, limit)),
        server.with_db(|conn| search::search(conn, "", "", &[], "recent", 10)),
        server.with_db(search::get_stats),
        server.with_db(move |conn| journal::list_journal(conn, &journal_since, 5)),
    );
    let (recent_obs, top_entities, stats, recent_journal) =
        (recent_obs?, top_entities?, stats?, recent_journal?);

    Ok(json!({
        "storage_path": server.db_path(),
        "entity_count": stats.entity_count,
        "observation_count": stats.observation_count,
        "recent_observations": recent_obs,
        "top_entities": top_entities,
        "recent_journal": recent_journal,
        "incomplete_tasks": [],
        "generated_at": crate::db::now_ms(),
    }))
}

/// The most recent observations across all live entities, newest first.
fn recent_observations(
    conn: &Connection,
    since: &str,
    limit: i64,
) -> Result<Vec<RecentObservation>> {
    // An unparseable window falls back to the default 24 hours.
    let since_ms = journal::parse_since(since)
        .unwrap_or_else(|_| (Utc::now() - Duration::hours(24)).timestamp_millis());

    let mut stmt = conn.prepare(
        "SELECT e.name, o.content, o.created_at
         FROM observations o
         JOIN entities e ON o.entity_id = e.id
         WHERE e.deleted_at IS NULL AND o.created_at >= ?1
         ORDER BY o.created_at DESC
         LIMIT ?2",
    )?;
    let observations = stmt
        .query_map(params![since_ms, limit], |row| {
            Ok(RecentObservation {
                entity_name: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(observations)
}
