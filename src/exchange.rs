//! Knowledge-graph exchange format — export and import.
//!
//! Records are a flat tagged shape compatible with mcp-knowledge-graph:
//! `{type:"entity", name, entityType, observations[], tags[]}` and
//! `{type:"relation", from, to, relationType}`. Export produces a JSON
//! array; import accepts that array or newline-delimited records.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{entity, relation, search};

/// One export/import record, either an entity or a relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeRecord {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "entityType", default, skip_serializing_if = "String::is_empty")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(rename = "relationType", default, skip_serializing_if = "String::is_empty")]
    pub relation_type: String,
}

/// Counts reported after an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub entities: usize,
    pub relations: usize,
    pub skipped: usize,
}

/// Collect every live entity (with observations and tags) followed by its
/// outgoing relations.
pub fn export_records(conn: &Connection) -> Result<Vec<ExchangeRecord>> {
    let results = search::search(conn, "", "", &[], "name", i64::MAX)?;

    let mut records = Vec::new();
    for result in &results {
        records.push(ExchangeRecord {
            kind: "entity".into(),
            name: result.entity.name.clone(),
            entity_type: result.entity.entity_type.clone(),
            observations: result.entity.observations.clone(),
            tags: result.entity.tags.clone(),
            ..Default::default()
        });

        for rel in relation::list_relations_by_entity(conn, &result.entity.name)? {
            if rel.from_name == result.entity.name {
                records.push(ExchangeRecord {
                    kind: "relation".into(),
                    from: rel.from_name,
                    to: rel.to_name,
                    relation_type: rel.relation,
                    ..Default::default()
                });
            }
        }
    }
    Ok(records)
}

/// Parse exchange data: a JSON array if the payload starts with `[`,
/// otherwise newline-delimited records. Malformed JSONL lines are logged and
/// skipped; a malformed array is an error.
pub fn parse_records(data: &str) -> Result<Vec<ExchangeRecord>> {
    let trimmed = data.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parse JSON array");
    }

    let mut records = Vec::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ExchangeRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(error = %err, "skipping malformed line"),
        }
    }
    Ok(records)
}

/// Apply records to the store. Entity records with an empty name and
/// relation records missing any field are skipped; unknown record types are
/// skipped with a warning.
pub fn import_records(conn: &Connection, records: &[ExchangeRecord]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for record in records {
        match record.kind.as_str() {
            "entity" => {
                if record.name.is_empty() {
                    summary.skipped += 1;
                    continue;
                }
                let entity_type = if record.entity_type.is_empty() {
                    "concept".to_string()
                } else {
                    record.entity_type.clone()
                };
                let input = entity::EntityInput {
                    name: record.name.clone(),
                    entity_type,
                    observations: record.observations.clone(),
                    tags: record.tags.clone(),
                };
                match entity::store_entities(conn, std::slice::from_ref(&input)) {
                    Ok(_) => summary.entities += 1,
                    Err(err) => {
                        tracing::warn!(name = %record.name, error = %err, "failed to import entity");
                        summary.skipped += 1;
                    }
                }
            }
            "relation" => {
                if record.from.is_empty() || record.to.is_empty() || record.relation_type.is_empty()
                {
                    summary.skipped += 1;
                    continue;
                }
                match relation::upsert_relation_by_name(
                    conn,
                    &record.from,
                    &record.to,
                    &record.relation_type,
                ) {
                    Ok(()) => summary.relations += 1,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to import relation");
                        summary.skipped += 1;
                    }
                }
            }
            other => {
                tracing::warn!(kind = %other, "unknown record type, skipping");
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn export_lists_entities_then_outgoing_relations() {
        let conn = open_memory_database().unwrap();
        entity::store_entities(
            &conn,
            &[entity::EntityInput {
                name: "Redis".into(),
                entity_type: "system".into(),
                observations: vec!["Port 6379".into()],
                tags: vec!["cache".into()],
            }],
        )
        .unwrap();
        relation::upsert_relation_by_name(&conn, "Redis", "Gateway", "used-by").unwrap();

        let records = export_records(&conn).unwrap();
        let entities: Vec<_> = records.iter().filter(|r| r.kind == "entity").collect();
        let relations: Vec<_> = records.iter().filter(|r| r.kind == "relation").collect();
        assert_eq!(entities.len(), 2); // Redis + auto-created Gateway
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].from, "Redis");
        assert_eq!(relations[0].to, "Gateway");
        assert_eq!(relations[0].relation_type, "used-by");
    }

    #[test]
    fn parse_accepts_array_and_jsonl() {
        let array = r#"[{"type":"entity","name":"A"},{"type":"relation","from":"A","to":"B","relationType":"uses"}]"#;
        assert_eq!(parse_records(array).unwrap().len(), 2);

        let jsonl = "{\"type\":\"entity\",\"name\":\"A\"}\nnot json\n{\"type\":\"entity\",\"name\":\"B\"}\n";
        let records = parse_records(jsonl).unwrap();
        assert_eq!(records.len(), 2); // malformed line skipped
    }

    #[test]
    fn import_skips_invalid_records() {
        let conn = open_memory_database().unwrap();
        let records = vec![
            ExchangeRecord {
                kind: "entity".into(),
                name: "Redis".into(),
                observations: vec!["Port 6379".into()],
                ..Default::default()
            },
            ExchangeRecord {
                kind: "entity".into(),
                ..Default::default() // empty name
            },
            ExchangeRecord {
                kind: "relation".into(),
                from: "Redis".into(),
                to: "Gateway".into(),
                relation_type: "used-by".into(),
                ..Default::default()
            },
            ExchangeRecord {
                kind: "relation".into(),
                from: "Redis".into(),
                ..Default::default() // missing to/relationType
            },
            ExchangeRecord {
                kind: "mystery".into(),
                ..Default::default()
            },
        ];

        let summary = import_records(&conn, &records).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                entities: 1,
                relations: 1,
                skipped: 3,
            }
        );

        // Empty entityType defaults to concept.
        let redis = entity::get_entity(&conn, "Redis").unwrap().unwrap();
        assert_eq!(redis.entity_type, "concept");
    }
}
