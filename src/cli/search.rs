//! `search` and `list` subcommands.

use aimemo::db::journal::JournalEntry;
use aimemo::db::{journal, search};
use anyhow::{Context, Result};
use serde_json::json;

use super::{open_db, print_entity};

/// Full-text search over entities and journal.
pub fn search(
    context: &str,
    query: &str,
    entity_type: Option<&str>,
    tags: &[String],
    limit: i64,
    sort: &str,
    as_json: bool,
) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let results = search::search(&conn, query, entity_type.unwrap_or(""), tags, sort, limit)
        .context("search")?;

    let journal_results = if query.is_empty() {
        Vec::new()
    } else {
        journal::search_journal(&conn, query, limit).context("journal search")?
    };

    if as_json {
        let payload = json!({
            "entities": results,
            "journal": journal_results,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if results.is_empty() && journal_results.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    for result in &results {
        print_entity(&result.entity);
    }
    print_journal_results(&journal_results);
    Ok(())
}

/// List all entities under the given filters and sort order.
pub fn list(
    context: &str,
    entity_type: Option<&str>,
    tags: &[String],
    limit: i64,
    sort: &str,
) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let results =
        search::search(&conn, "", entity_type.unwrap_or(""), tags, sort, limit).context("list")?;

    if results.is_empty() {
        println!("No entities in memory. Use 'aimemo add' or let your AI agent store them.");
        return Ok(());
    }
    for result in &results {
        print_entity(&result.entity);
    }
    println!("\nTotal: {} entities", results.len());
    Ok(())
}

fn print_journal_results(entries: &[JournalEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("── journal ──");
    for entry in entries {
        println!("  {}", entry.content);
    }
}
