#![allow(dead_code)]

use aimemo::db;
use aimemo::db::entity::{self, EntityInput};
use rusqlite::Connection;

/// Open a fresh in-memory database with the schema installed.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Store one entity with observations and return its id.
pub fn seed_entity(conn: &Connection, name: &str, entity_type: &str, observations: &[&str]) -> i64 {
    let input = EntityInput {
        name: name.to_string(),
        entity_type: entity_type.to_string(),
        observations: observations.iter().map(|s| s.to_string()).collect(),
        tags: Vec::new(),
    };
    let stored = entity::store_entities(conn, std::slice::from_ref(&input)).unwrap();
    stored[0].id
}

/// Row count of a table or FTS index.
pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
