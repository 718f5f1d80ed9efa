//! Entity subcommands — `add`, `get`, `observe`, `retract`, `forget`,
//! `link`.

use aimemo::db::{entity, observation, relation};
use anyhow::{bail, Context, Result};

use super::open_db;

/// Add an entity with one or more observations.
pub fn add(
    context: &str,
    name: &str,
    entity_type: &str,
    observations: &[String],
    tags: &[String],
) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let input = entity::EntityInput {
        name: name.to_string(),
        entity_type: entity_type.to_string(),
        observations: observations.to_vec(),
        tags: tags.to_vec(),
    };
    let results =
        entity::store_entities(&conn, std::slice::from_ref(&input)).context("add entity")?;

    if let Some(stored) = results.first() {
        println!("Stored entity: {} ({})", stored.name, stored.entity_type);
        for obs in observations {
            println!("  + {obs}");
        }
    }
    Ok(())
}

/// Show details for a specific entity, including its relations.
pub fn get(context: &str, name: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let Some(e) = entity::get_entity(&conn, name).context("get entity")? else {
        if entity::is_soft_deleted(&conn, name)? {
            bail!(
                "entity {name:?} is soft-deleted; re-add it to restore, or run \
                 'aimemo forget {name} --permanent' to hard-delete"
            );
        }
        bail!("entity {name:?} not found");
    };

    let tags = if e.tags.is_empty() {
        "(none)".to_string()
    } else {
        e.tags.join(", ")
    };
    println!("Name:         {}", e.name);
    println!("Type:         {}", e.entity_type);
    println!("Tags:         {tags}");
    println!("Access count: {}", e.access_count);
    println!("Observations ({}):", e.observations.len());
    for obs in &e.observations {
        println!("  - {obs}");
    }

    let rels = relation::list_relations_by_entity(&conn, name)?;
    if !rels.is_empty() {
        println!("Relations ({}):", rels.len());
        for r in &rels {
            println!("  {} -[{}]-> {}", r.from_name, r.relation, r.to_name);
        }
    }
    Ok(())
}

/// Add an observation to an existing entity.
pub fn observe(context: &str, name: &str, content: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let Some(e) = entity::get_entity(&conn, name).context("get entity")? else {
        bail!("entity {name:?} not found — use 'aimemo add' to create it");
    };

    observation::add_observation(&conn, e.id, content).context("add observation")?;
    println!("Observation added to {name:?}:\n  + {content}");
    Ok(())
}

/// Remove a specific observation from an entity.
pub fn retract(context: &str, name: &str, content: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let remaining = observation::retract_observation(&conn, name, content).context("retract")?;

    println!("Retracted from {name:?}:\n  - {content}");
    if remaining.is_empty() {
        println!("No observations remaining.");
    } else {
        println!("Remaining observations ({}):", remaining.len());
        for obs in &remaining {
            println!("  • {obs}");
        }
    }
    Ok(())
}

/// Soft-delete (or permanently delete) an entity.
pub fn forget(context: &str, name: &str, permanent: bool) -> Result<()> {
    let (conn, _) = open_db(context)?;

    if permanent {
        entity::hard_delete_entity(&conn, name).context("hard delete")?;
        println!("Permanently deleted entity: {name}");
    } else {
        entity::soft_delete_entity(&conn, name).context("soft delete")?;
        println!("Soft-deleted entity: {name} (recoverable)");
    }
    Ok(())
}

/// Create a typed relation between two entities.
pub fn link(context: &str, from: &str, relation_type: &str, to: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    relation::upsert_relation_by_name(&conn, from, to, relation_type).context("link")?;
    println!("{from} -[{relation_type}]-> {to}");
    Ok(())
}
