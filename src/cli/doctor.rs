//! `doctor` subcommand — check installation health.

use aimemo::db::search;
use aimemo::{db, locate};
use anyhow::{bail, Result};
use rusqlite::Connection;
use std::time::Instant;

/// Run the health checks and print a report. Fails when any check fails.
pub fn doctor(context: &str) -> Result<()> {
    let mut all_ok = true;
    let mut check = |label: &str, ok: bool, detail: &str| {
        if ok {
            println!("[OK] {label}");
        } else {
            println!("[FAIL] {label}: {detail}");
            all_ok = false;
        }
    };

    // 1. Storage path
    let db_path = match locate::find_project_db(context) {
        Ok(path) => {
            check(&format!("Storage path: {}", path.display()), true, "");
            path
        }
        Err(err) => {
            check("Storage path", false, &err.to_string());
            bail!("health checks failed");
        }
    };

    // 2. Database opens with session settings applied
    let conn = match db::open_database(&db_path) {
        Ok(conn) => {
            check("Database writable", true, "");
            conn
        }
        Err(err) => {
            check("Database writable", false, &format!("{err:#}"));
            bail!("health checks failed");
        }
    };

    // 3. FTS5 functional
    check(
        "FTS5 functional (porter unicode61 tokenizer)",
        fts5_works(&conn),
        "FTS5 not available in this SQLite build",
    );

    // 4. WAL mode
    let journal_mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap_or_default();
    check(
        "WAL mode enabled",
        journal_mode == "wal",
        &format!("journal_mode={journal_mode}"),
    );

    // 5. Empty-query search latency
    let start = Instant::now();
    let searched = search::search(&conn, "", "", &[], "", 1).is_ok();
    let elapsed = start.elapsed();
    check(
        "Empty-query search responds in <50ms",
        searched && elapsed.as_millis() < 50,
        &format!("took {elapsed:?}"),
    );

    println!();
    if all_ok {
        println!("All checks passed. aimemo is ready.");
        println!();
        println!("To register with Claude Code:");
        println!("  claude mcp add-json \"aimemo-memory\" '{{\"command\":\"aimemo\",\"args\":[\"serve\"]}}'");
        Ok(())
    } else {
        bail!("health checks failed")
    }
}

fn fts5_works(conn: &Connection) -> bool {
    // Querying the entity index exercises the tokenizer; zero rows is fine.
    conn.query_row(
        "SELECT COUNT(*) FROM entities_fts WHERE entities_fts MATCH 'test'",
        [],
        |row| row.get::<_, i64>(0),
    )
    .is_ok()
}
