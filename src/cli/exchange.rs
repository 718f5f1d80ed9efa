//! `export` and `import` subcommands around the exchange format.

use aimemo::exchange;
use anyhow::{bail, Context, Result};

use super::open_db;

/// Export all memory as a JSON array (knowledge-graph compatible) or as
/// Markdown for humans.
pub fn export(context: &str, format: &str) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let records = exchange::export_records(&conn).context("export")?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        "markdown" | "md" => {
            println!("# Memory Export");
            println!();
            for record in records.iter().filter(|r| r.kind == "entity") {
                let tags = if record.tags.is_empty() {
                    String::new()
                } else {
                    format!(" `{}`", record.tags.join("` `"))
                };
                println!("## {} ({}){}", record.name, record.entity_type, tags);
                println!();
                for obs in &record.observations {
                    println!("- {obs}");
                }
                println!();
            }
        }
        other => bail!("unknown format {other:?}: use json or markdown"),
    }

    let entities = records.iter().filter(|r| r.kind == "entity").count();
    eprintln!(
        "Exported {} entities and {} relations.",
        entities,
        records.len() - entities
    );
    Ok(())
}

/// Import records from a JSON array or JSONL file.
pub fn import(context: &str, file: &str) -> Result<()> {
    let data = std::fs::read_to_string(file).with_context(|| format!("open file {file}"))?;

    let (conn, _) = open_db(context)?;

    let records = exchange::parse_records(&data)?;
    let summary = exchange::import_records(&conn, &records).context("import")?;

    println!("Import complete:");
    println!("  Entities:  {}", summary.entities);
    println!("  Relations: {}", summary.relations);
    if summary.skipped > 0 {
        println!("  Skipped:   {} (malformed)", summary.skipped);
    }
    Ok(())
}
