//! `stats` and `tags` subcommands.

use aimemo::db::search;
use anyhow::{Context, Result};

use super::open_db;

/// Show memory statistics.
pub fn stats(context: &str) -> Result<()> {
    let (conn, db_path) = open_db(context)?;

    let stats = search::get_stats(&conn).context("stats")?;
    println!("Storage:      {}", db_path.display());
    println!("Entities:     {}", stats.entity_count);
    println!("Observations: {}", stats.observation_count);
    println!("Relations:    {}", stats.relation_count);
    println!("Journal:      {} entries", stats.journal_count);
    Ok(())
}

/// List all tags in use.
pub fn tags(context: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let tags = search::distinct_tags(&conn).context("query tags")?;
    if tags.is_empty() {
        println!("No tags in use.");
        return Ok(());
    }
    for tag in &tags {
        println!("{tag}");
    }
    Ok(())
}
