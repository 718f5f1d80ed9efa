//! Locates the database file for a context.
//!
//! The search walks up from the working directory looking for a project-local
//! `.aimemo/` directory, stopping at the user's home or the filesystem root,
//! and falls back to a per-user `~/.aimemo/` directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Sanitize a context name to `[a-z0-9-]` for safe use in filenames.
pub fn sanitize_context(context: &str) -> String {
    let sanitized: String = context
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    sanitized.trim_matches('-').to_string()
}

/// The database filename for a context: `memory.db` for the default context,
/// `memory-<sanitized>.db` otherwise.
pub fn db_name(context: &str) -> String {
    if context.is_empty() || context == "default" {
        "memory.db".to_string()
    } else {
        format!("memory-{}.db", sanitize_context(context))
    }
}

/// Find the database path for a context: the nearest project-local
/// `.aimemo/` directory at or above the current directory, else the global
/// per-user location (created if needed).
pub fn find_project_db(context: &str) -> Result<PathBuf> {
    let Ok(cwd) = std::env::current_dir() else {
        return global_db_path(context);
    };
    let home = dirs::home_dir();

    if let Some(found) = project_db_from(&cwd, home.as_deref(), context) {
        return Ok(found);
    }
    global_db_path(context)
}

/// Walk from `start` toward the root looking for an existing `.aimemo/`
/// directory, stopping after checking `home` (when `start` is under it) or
/// the filesystem root.
fn project_db_from(start: &Path, home: Option<&Path>, context: &str) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let aimemo = dir.join(".aimemo");
        if aimemo.is_dir() {
            return Some(aimemo.join(db_name(context)));
        }
        if Some(dir) == home {
            return None;
        }
        dir = dir.parent()?;
    }
}

/// The global fallback path: `~/.aimemo/<dbname>`, creating the directory.
fn global_db_path(context: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    let dir = home.join(".aimemo");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(dir.join(db_name(context)))
}

/// The user's config file path: `$XDG_CONFIG_HOME/aimemo/config.toml` when
/// set, else `~/.aimemo/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("aimemo").join("config.toml"));
        }
    }
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".aimemo").join("config.toml"))
}
