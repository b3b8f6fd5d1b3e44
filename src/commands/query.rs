// src/commands/query.rs
//! Search and informational commands

use anyhow::Result;
use ralph::db::paths;
use ralph::{PackageDatabase, Scope};
use std::path::Path;

/// Search package names across the scope chain with a wildcard
pub fn cmd_search(pattern: &str, directory: &Path) -> Result<()> {
    let db = PackageDatabase::open_scope(Scope::Project, directory)?;
    let matches = db.search(pattern)?;
    if matches.is_empty() {
        println!("No packages match '{pattern}'");
    }
    for name in matches {
        println!("{name}");
    }
    Ok(())
}

/// Show the available database locations
pub fn cmd_info(directory: &Path) -> Result<()> {
    for scope in [Scope::Project, Scope::User, Scope::System] {
        match paths::database_path(scope, directory) {
            Some(path) => {
                let state = if path.join("sources.json").exists() {
                    "present"
                } else {
                    "absent"
                };
                println!("Database location: {scope} at {} ({state})", path.display());
            }
            None => println!("Database location: {scope} is unavailable on this platform"),
        }
    }
    Ok(())
}
