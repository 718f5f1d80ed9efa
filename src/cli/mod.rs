//! CLI subcommands — thin wrappers over the storage layer that format human
//! output. The MCP `serve` entry point lives here too.

pub mod doctor;
pub mod entity;
pub mod exchange;
pub mod init;
pub mod journal;
pub mod search;
pub mod stats;

use aimemo::config::AimemoConfig;
use aimemo::db::entity::Entity;
use aimemo::{db, locate, mcp};
use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use rusqlite::Connection;
use std::path::PathBuf;

/// Open the database for the current context.
pub fn open_db(context: &str) -> Result<(Connection, PathBuf)> {
    let db_path = locate::find_project_db(context).context("find db")?;
    let conn = db::open_database(&db_path)
        .with_context(|| format!("open db {}", db_path.display()))?;
    Ok((conn, db_path))
}

/// Start the MCP server on stdio. Usually auto-spawned by the AI client.
pub async fn serve(context: &str, config: &AimemoConfig) -> Result<()> {
    let (conn, db_path) = open_db(context)?;
    tracing::info!(db = %db_path.display(), "aimemo MCP server starting");
    eprintln!("aimemo MCP server ready (db: {})", db_path.display());

    let server = mcp::Server::new(conn, db_path.display().to_string(), config);
    server.serve_stdio().await
}

/// Render a unix-ms timestamp in local time.
pub(crate) fn format_ts(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// Print an entity with its tags and observations.
pub(crate) fn print_entity(entity: &Entity) {
    let tags = if entity.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", entity.tags.join(", "))
    };
    println!("• {} ({}){}", entity.name, entity.entity_type, tags);
    for obs in &entity.observations {
        println!("  - {obs}");
    }
}
