//! Full-text index parity: after any sequence of inserts, updates, soft
//! deletes, restores, and hard deletes, each index row count equals the live
//! count of the corresponding base subset.

mod helpers;

use aimemo::db::{entity, journal, observation};
use helpers::{count, seed_entity, test_db};
use rusqlite::Connection;

fn assert_parity(conn: &Connection) {
    let live_entities: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entities WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count(conn, "entities_fts"), live_entities, "entities_fts parity");

    // Observation index rows follow observation rows regardless of the
    // owner's soft-delete state.
    assert_eq!(
        count(conn, "observations_fts"),
        count(conn, "observations"),
        "observations_fts parity"
    );
    assert_eq!(count(conn, "journal_fts"), count(conn, "journal"), "journal_fts parity");
}

#[test]
fn parity_through_full_lifecycle() {
    let conn = test_db();
    assert_parity(&conn);

    // Inserts propagate.
    let id = seed_entity(&conn, "Redis", "system", &["Port 6379", "Version 7.2"]);
    seed_entity(&conn, "Gateway", "service", &[]);
    journal::append_journal(&conn, "session one", &[]).unwrap();
    assert_parity(&conn);

    // Type rewrite re-indexes without duplicating.
    entity::upsert_entity(&conn, "Redis", "datastore", &[]).unwrap();
    assert_parity(&conn);

    // Soft delete removes the entity index row but not observation rows.
    entity::soft_delete_entity(&conn, "Redis").unwrap();
    assert_parity(&conn);
    assert_eq!(count(&conn, "observations_fts"), 2);

    // Restore re-adds the entity index row.
    entity::upsert_entity(&conn, "Redis", "datastore", &[]).unwrap();
    assert_parity(&conn);

    // Observation retract propagates.
    observation::retract_observation(&conn, "Redis", "Port 6379").unwrap();
    assert_parity(&conn);

    // Hard delete cascades into both indexes.
    entity::hard_delete_entity(&conn, "Redis").unwrap();
    assert_parity(&conn);
    assert_eq!(count(&conn, "observations_fts"), 0);

    // Soft-deleted rows also disappear from the index on hard delete.
    entity::soft_delete_entity(&conn, "Gateway").unwrap();
    entity::hard_delete_entity(&conn, "Gateway").unwrap();
    assert_parity(&conn);

    journal::append_journal(&conn, "session two", &[]).unwrap();
    assert_parity(&conn);
}

#[test]
fn soft_deleted_entity_unsearchable_by_name_but_observation_rows_remain() {
    let conn = test_db();
    seed_entity(&conn, "Phantom", "system", &["lingering fact"]);
    entity::soft_delete_entity(&conn, "Phantom").unwrap();

    let hits: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entities_fts WHERE entities_fts MATCH 'phantom'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hits, 0);

    // The observation index still holds the row; the search layer filters
    // the dead owner out.
    let hits: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM observations_fts WHERE observations_fts MATCH 'lingering'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hits, 1);
    assert!(aimemo::db::search::search(&conn, "lingering", "", &[], "", 10)
        .unwrap()
        .is_empty());
}
