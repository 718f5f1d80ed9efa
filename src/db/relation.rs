//! Relation operations — directed typed edges with triple deduplication and
//! endpoint auto-creation.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::entity::ensure_entity;

/// A directed typed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub from_id: i64,
    #[serde(rename = "from")]
    pub from_name: String,
    pub to_id: i64,
    #[serde(rename = "to")]
    pub to_name: String,
    pub relation: String,
    pub created_at: i64,
}

/// Create a typed relation between two entities by id. A duplicate
/// `(from, to, relation)` triple is silently ignored.
pub fn upsert_relation(conn: &Connection, from_id: i64, to_id: i64, relation: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO relations (from_id, to_id, relation)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(from_id, to_id, relation) DO NOTHING",
        params![from_id, to_id, relation],
    )?;
    Ok(())
}

/// Create a relation between named entities, auto-creating missing endpoints
/// as minimal `concept` entities without overwriting existing rows.
pub fn upsert_relation_by_name(
    conn: &Connection,
    from_name: &str,
    to_name: &str,
    relation: &str,
) -> Result<()> {
    let from_id = ensure_entity(conn, from_name)
        .with_context(|| format!("ensure entity {from_name:?}"))?;
    let to_id =
        ensure_entity(conn, to_name).with_context(|| format!("ensure entity {to_name:?}"))?;
    upsert_relation(conn, from_id, to_id, relation)
}

/// All relations touching a named entity (either direction, case-insensitive
/// match), oldest first. Both endpoints must be live: soft-deleting an
/// endpoint hides the edge without deleting it, and restoring both endpoints
/// makes it visible again.
pub fn list_relations_by_entity(conn: &Connection, name: &str) -> Result<Vec<Relation>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.from_id, fe.name, r.to_id, te.name, r.relation, r.created_at
         FROM relations r
         JOIN entities fe ON r.from_id = fe.id
         JOIN entities te ON r.to_id = te.id
         WHERE (lower(fe.name) = lower(?1) OR lower(te.name) = lower(?1))
           AND fe.deleted_at IS NULL AND te.deleted_at IS NULL
         ORDER BY r.created_at ASC",
    )?;
    let relations = stmt
        .query_map(params![name], |row| {
            Ok(Relation {
                id: row.get(0)?,
                from_id: row.get(1)?,
                from_name: row.get(2)?,
                to_id: row.get(3)?,
                to_name: row.get(4)?,
                relation: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entity::{get_entity, upsert_entity};
    use crate::db::open_memory_database;

    #[test]
    fn link_by_name_auto_creates_endpoints() {
        let conn = open_memory_database().unwrap();
        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        let gateway = get_entity(&conn, "Gateway").unwrap().unwrap();
        assert_eq!(gateway.entity_type, "concept");
        assert!(gateway.tags.is_empty());

        let rels = list_relations_by_entity(&conn, "Redis").unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation, "used-by");
        assert_eq!(rels[0].from_name, "Redis");
        assert_eq!(rels[0].to_name, "Gateway");
    }

    #[test]
    fn auto_create_preserves_existing_entity() {
        let conn = open_memory_database().unwrap();
        upsert_entity(&conn, "Redis", "system", &["cache".into()]).unwrap();

        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        let redis = get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(redis.entity_type, "system");
        assert_eq!(redis.tags, vec!["cache"]);
    }

    #[test]
    fn duplicate_triple_is_idempotent() {
        let conn = open_memory_database().unwrap();
        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();
        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        // A different relation type is a distinct edge.
        upsert_relation_by_name(&conn, "Redis", "Gateway", "caches-for").unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn soft_deleted_endpoint_hides_edge_until_restored() {
        let conn = open_memory_database().unwrap();
        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        crate::db::entity::soft_delete_entity(&conn, "Gateway").unwrap();
        assert!(list_relations_by_entity(&conn, "Redis").unwrap().is_empty());

        // Edge row still exists; restoring the endpoint makes it visible again.
        upsert_entity(&conn, "Gateway", "concept", &[]).unwrap();
        assert_eq!(list_relations_by_entity(&conn, "Redis").unwrap().len(), 1);
    }

    #[test]
    fn hard_delete_cascades_edges() {
        let conn = open_memory_database().unwrap();
        upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        crate::db::entity::hard_delete_entity(&conn, "Gateway").unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
