//! Observation operations — dedup-insert, list, and exact-content retract.

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Maximum observation content length in bytes.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024;

/// Add an observation to an entity. Duplicate `(entity, content)` pairs are
/// silently ignored.
pub fn add_observation(conn: &Connection, entity_id: i64, content: &str) -> Result<()> {
    if content.is_empty() {
        bail!("observation content cannot be empty");
    }
    if content.len() > MAX_CONTENT_BYTES {
        bail!("observation content exceeds 10KB limit");
    }
    conn.execute(
        "INSERT INTO observations (entity_id, content)
         VALUES (?1, ?2)
         ON CONFLICT(entity_id, content) DO NOTHING",
        params![entity_id, content],
    )?;
    Ok(())
}

/// All observation contents for an entity, oldest first.
pub fn list_observations(conn: &Connection, entity_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT content FROM observations WHERE entity_id = ?1 ORDER BY created_at ASC",
    )?;
    let obs = stmt
        .query_map(params![entity_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(obs)
}

/// Remove a specific observation from a live entity by exact content match.
/// Returns the remaining observations after deletion.
pub fn retract_observation(
    conn: &Connection,
    entity_name: &str,
    content: &str,
) -> Result<Vec<String>> {
    let entity_id: Option<i64> = conn
        .query_row(
            "SELECT id FROM entities WHERE lower(name) = lower(?1) AND deleted_at IS NULL",
            params![entity_name],
            |row| row.get(0),
        )
        .optional()?;
    let Some(entity_id) = entity_id else {
        bail!("entity {entity_name:?} not found");
    };

    let affected = conn.execute(
        "DELETE FROM observations WHERE entity_id = ?1 AND content = ?2",
        params![entity_id, content],
    )?;
    if affected == 0 {
        bail!("observation not found in entity {entity_name:?}");
    }

    list_observations(conn, entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entity::upsert_entity;
    use crate::db::open_memory_database;

    #[test]
    fn add_and_list_ordered() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(&conn, "Redis", "system", &[]).unwrap();

        add_observation(&conn, id, "Runs on port 6379").unwrap();
        add_observation(&conn, id, "Used for session store").unwrap();
        // Duplicate is a no-op success.
        add_observation(&conn, id, "Runs on port 6379").unwrap();

        let obs = list_observations(&conn, id).unwrap();
        assert_eq!(obs, vec!["Runs on port 6379", "Used for session store"]);
    }

    #[test]
    fn content_size_bounds() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(&conn, "Redis", "system", &[]).unwrap();

        assert!(add_observation(&conn, id, &"x".repeat(10240)).is_ok());
        assert!(add_observation(&conn, id, &"y".repeat(10241)).is_err());
        assert!(add_observation(&conn, id, "").is_err());
    }

    #[test]
    fn retract_removes_exact_content() {
        let conn = open_memory_database().unwrap();
        let id = upsert_entity(&conn, "Redis", "system", &[]).unwrap();
        add_observation(&conn, id, "Port 6379").unwrap();
        add_observation(&conn, id, "Version 7.2").unwrap();

        let remaining = retract_observation(&conn, "Redis", "Port 6379").unwrap();
        assert_eq!(remaining, vec!["Version 7.2"]);
    }

    #[test]
    fn retract_errors() {
        let conn = open_memory_database().unwrap();
        upsert_entity(&conn, "Redis", "system", &[]).unwrap();

        let err = retract_observation(&conn, "ghost", "anything").unwrap_err();
        assert!(err.to_string().contains("not found"));

        let err = retract_observation(&conn, "Redis", "never stored").unwrap_err();
        assert!(err.to_string().contains("observation not found"));
    }
}
