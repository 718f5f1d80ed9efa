//! `init` subcommand — create project-local memory in the current directory.

use anyhow::{Context, Result};

use super::open_db;

const GITIGNORE: &str = "\
# aimemo memory database (binary, not diff-friendly)
memory.db
memory-*.db
# Export files are gitignore-exempt so you can commit them
!memory-export.json
!memory-export.md
";

/// Create `.aimemo/` here, seed its `.gitignore`, and open the database once
/// to validate the installation.
pub fn init(context: &str) -> Result<()> {
    std::fs::create_dir_all(".aimemo").context("create .aimemo")?;
    std::fs::write(".aimemo/.gitignore", GITIGNORE).context("write .gitignore")?;

    let (_, db_path) = open_db(context)?;

    println!("Initialized aimemo memory in .aimemo/");
    println!("Database: {}\n", db_path.display());
    println!("To register with Claude Code:");
    println!("  claude mcp add-json \"aimemo-memory\" '{{\"command\":\"aimemo\",\"args\":[\"serve\"]}}'");
    Ok(())
}
