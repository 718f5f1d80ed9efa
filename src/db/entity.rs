//! Entity operations — upsert, fetch with access accounting, soft/hard
//! delete, and batch store.
//!
//! Entity names are unique by exact match but looked up case-insensitively.
//! Soft deletion stamps `deleted_at` and is reversed by a later upsert of the
//! same name; hard deletion removes the row and cascades to observations and
//! relations through foreign keys.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::now_ms;
use crate::db::observation;

/// Maximum entity name length in bytes.
pub const MAX_NAME_BYTES: usize = 1024;
/// Maximum entity type length in bytes.
pub const MAX_TYPE_BYTES: usize = 256;

/// A named entity in the memory graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub entity_type: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    pub access_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
}

/// Input shape for storing entities, as supplied by tools and import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityInput {
    pub name: String,
    #[serde(rename = "entityType", default)]
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Scan an entity row (without observations). Expects the column order
/// `id, name, entity_type, tags, created_at, updated_at, deleted_at,
/// access_count, last_accessed`.
pub(crate) fn entity_from_row(row: &Row) -> rusqlite::Result<Entity> {
    let tags_json: String = row.get(3)?;
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_type: row.get(2)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        deleted_at: row.get(6)?,
        access_count: row.get(7)?,
        last_accessed: row.get(8)?,
        observations: Vec::new(),
    })
}

const ENTITY_COLUMNS: &str = "id, name, entity_type, tags, created_at, updated_at, deleted_at, \
                              access_count, last_accessed";

/// Upsert an entity: insert, or on name conflict update type, tags, and
/// `updated_at`, clearing any soft-delete stamp (restoration semantics).
/// Returns the entity id via a follow-up lookup — the conflict path of the
/// upsert cannot report it reliably.
pub fn upsert_entity(conn: &Connection, name: &str, entity_type: &str, tags: &[String]) -> Result<i64> {
    if name.is_empty() {
        bail!("entity name cannot be empty");
    }
    if name.len() > MAX_NAME_BYTES {
        bail!("entity name exceeds 1KB limit");
    }
    if entity_type.len() > MAX_TYPE_BYTES {
        bail!("entity type exceeds 256-byte limit");
    }
    let tags_json = serde_json::to_string(tags).context("encode tags")?;

    conn.execute(
        "INSERT INTO entities (name, entity_type, tags, updated_at)
         VALUES (?1, ?2, ?3, unixepoch('now', 'subsec') * 1000)
         ON CONFLICT(name) DO UPDATE SET
             entity_type = excluded.entity_type,
             tags = excluded.tags,
             updated_at = excluded.updated_at,
             deleted_at = NULL",
        params![name, entity_type, tags_json],
    )
    .context("upsert entity")?;

    let id: i64 = conn
        .query_row("SELECT id FROM entities WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .context("get entity id")?;
    Ok(id)
}

/// Insert-if-absent with defaults. Unlike [`upsert_entity`] this never
/// overwrites an existing row's type or tags. Used by relation auto-creation.
pub fn ensure_entity(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO entities (name, entity_type, tags) VALUES (?1, 'concept', '[]')",
        params![name],
    )?;
    let id: i64 = conn
        .query_row("SELECT id FROM entities WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .with_context(|| format!("ensure entity {name:?}"))?;
    Ok(id)
}

/// Fetch a live entity by name (case-insensitive) with its observations.
/// A hit bumps the access counter and stamps `last_accessed`. Soft-deleted
/// rows report as absent; use [`is_soft_deleted`] to distinguish.
pub fn get_entity(conn: &Connection, name: &str) -> Result<Option<Entity>> {
    let sql = format!(
        "SELECT {ENTITY_COLUMNS} FROM entities \
         WHERE lower(name) = lower(?1) AND deleted_at IS NULL"
    );
    let entity = conn
        .query_row(&sql, params![name], entity_from_row)
        .optional()?;

    let Some(mut entity) = entity else {
        return Ok(None);
    };

    let now = now_ms();
    conn.execute(
        "UPDATE entities SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
        params![now, entity.id],
    )?;
    entity.access_count += 1;
    entity.last_accessed = Some(now);

    entity.observations = observation::list_observations(conn, entity.id)?;
    Ok(Some(entity))
}

/// Fetch a live entity by id, without access accounting or observations.
pub fn get_entity_by_id(conn: &Connection, id: i64) -> Result<Option<Entity>> {
    let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1 AND deleted_at IS NULL");
    Ok(conn.query_row(&sql, params![id], entity_from_row).optional()?)
}

/// Whether a row with this name exists but carries a soft-delete stamp.
/// Callers use this to turn "not found" into a recovery hint.
pub fn is_soft_deleted(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entities WHERE lower(name) = lower(?1) AND deleted_at IS NOT NULL",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Soft-delete the unique live row matching the name.
pub fn soft_delete_entity(conn: &Connection, name: &str) -> Result<()> {
    let affected = conn.execute(
        "UPDATE entities SET deleted_at = ?1 WHERE lower(name) = lower(?2) AND deleted_at IS NULL",
        params![now_ms(), name],
    )?;
    if affected == 0 {
        bail!("entity {name:?} not found");
    }
    Ok(())
}

/// Permanently delete an entity (live or soft-deleted), cascading to its
/// observations and relations.
pub fn hard_delete_entity(conn: &Connection, name: &str) -> Result<()> {
    let affected = conn.execute(
        "DELETE FROM entities WHERE lower(name) = lower(?1)",
        params![name],
    )?;
    if affected == 0 {
        bail!("entity {name:?} not found");
    }
    Ok(())
}

/// Upsert a batch of entities with their observations, returning each
/// entity's post-state including the deduplicated observation list.
pub fn store_entities(conn: &Connection, inputs: &[EntityInput]) -> Result<Vec<Entity>> {
    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        let entity_type = if input.entity_type.is_empty() {
            "concept"
        } else {
            &input.entity_type
        };
        let id = upsert_entity(conn, &input.name, entity_type, &input.tags)
            .with_context(|| format!("upsert {:?}", input.name))?;
        for obs in &input.observations {
            observation::add_observation(conn, id, obs)
                .with_context(|| format!("add observation to {:?}", input.name))?;
        }
        if let Some(mut entity) = get_entity_by_id(conn, id)? {
            entity.observations = observation::list_observations(conn, id)?;
            results.push(entity);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn upsert_and_get() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(
            &conn,
            "Redis",
            "system",
            &["cache".into(), "infra".into()],
        )
        .unwrap();
        assert!(id > 0);

        let e = get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(e.name, "Redis");
        assert_eq!(e.entity_type, "system");
        assert_eq!(e.tags, vec!["cache", "infra"]);
    }

    #[test]
    fn upsert_same_name_keeps_id_and_updates() {
        let conn = open_memory_database().unwrap();
        let id1 = upsert_entity(&conn, "Redis", "system", &["cache".into()]).unwrap();
        let id2 = upsert_entity(&conn, "Redis", "datastore", &["infra".into()]).unwrap();
        assert_eq!(id1, id2);

        let e = get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(e.entity_type, "datastore");
        assert_eq!(e.tags, vec!["infra"]);
    }

    #[test]
    fn lookup_is_case_insensitive_name_preserved() {
        let conn = open_memory_database().unwrap();
        upsert_entity(&conn, "OpenClaw", "system", &[]).unwrap();

        let e = get_entity(&conn, "openclaw").unwrap().unwrap();
        assert_eq!(e.name, "OpenClaw");
    }

    #[test]
    fn get_bumps_access_count() {
        let conn = open_memory_database().unwrap();
        upsert_entity(&conn, "Redis", "system", &[]).unwrap();

        let first = get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(first.access_count, 1);
        assert!(first.last_accessed.is_some());

        let second = get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(second.access_count, 2);
    }

    #[test]
    fn name_size_bounds() {
        let conn = open_memory_database().unwrap();
        assert!(upsert_entity(&conn, &"a".repeat(1024), "t", &[]).is_ok());
        assert!(upsert_entity(&conn, &"b".repeat(1025), "t", &[]).is_err());
        assert!(upsert_entity(&conn, "", "t", &[]).is_err());
        assert!(upsert_entity(&conn, "ok", &"t".repeat(257), &[]).is_err());
    }

    #[test]
    fn soft_delete_hides_and_upsert_restores() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(&conn, "Old Thing", "concept", &[]).unwrap();
        observation::add_observation(&conn, id, "kept across delete").unwrap();

        soft_delete_entity(&conn, "Old Thing").unwrap();
        assert!(get_entity(&conn, "Old Thing").unwrap().is_none());
        assert!(is_soft_deleted(&conn, "old thing").unwrap());

        // Re-upsert clears the stamp and the observations are intact.
        upsert_entity(&conn, "Old Thing", "concept", &[]).unwrap();
        let e = get_entity(&conn, "Old Thing").unwrap().unwrap();
        assert_eq!(e.observations, vec!["kept across delete"]);
    }

    #[test]
    fn soft_delete_missing_errors() {
        let conn = open_memory_database().unwrap();
        let err = soft_delete_entity(&conn, "ghost").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn hard_delete_cascades() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(&conn, "Temp", "concept", &[]).unwrap();
        observation::add_observation(&conn, id, "some fact").unwrap();

        hard_delete_entity(&conn, "Temp").unwrap();
        assert!(get_entity(&conn, "Temp").unwrap().is_none());

        let orphans: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM observations WHERE entity_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn hard_delete_reaches_soft_deleted_rows() {
        let conn = open_memory_database().unwrap();
        upsert_entity(&conn, "Temp", "concept", &[]).unwrap();
        soft_delete_entity(&conn, "Temp").unwrap();

        hard_delete_entity(&conn, "Temp").unwrap();
        assert!(!is_soft_deleted(&conn, "Temp").unwrap());
    }

    #[test]
    fn store_entities_defaults_type_and_dedups() {
        let conn = open_memory_database().unwrap();
        let inputs = vec![
            EntityInput {
                name: "Redis".into(),
                entity_type: "system".into(),
                observations: vec!["Port 6379".into(), "In-memory".into()],
                tags: vec!["cache".into()],
            },
            EntityInput {
                name: "PG".into(),
                ..Default::default()
            },
        ];
        let results = store_entities(&conn, &inputs).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].observations.len(), 2);
        assert_eq!(results[1].entity_type, "concept");

        // Same batch again: observations do not duplicate.
        let results = store_entities(&conn, &inputs).unwrap();
        assert_eq!(results[0].observations.len(), 2);
    }
}
