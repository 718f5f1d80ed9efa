//! `append` and `journal` subcommands.

use aimemo::db::journal;
use anyhow::{Context, Result};

use super::{format_ts, open_db};

/// Append a timestamped journal entry.
pub fn append(context: &str, message: &str, tags: &[String]) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let entry = journal::append_journal(&conn, message, tags).context("append journal")?;
    println!("[{}] {}", format_ts(entry.created_at), entry.content);
    Ok(())
}

/// Print journal entries in the window, oldest first.
pub fn list(context: &str, since: &str, limit: i64) -> Result<()> {
    let (conn, _) = open_db(context)?;

    let mut entries = journal::list_journal(&conn, since, limit).context("journal")?;
    if entries.is_empty() {
        println!("No journal entries found.");
        return Ok(());
    }

    // Stored newest-first; show oldest first for reading.
    entries.reverse();
    for entry in &entries {
        println!("[{}] {}", format_ts(entry.created_at), entry.content);
    }
    Ok(())
}
