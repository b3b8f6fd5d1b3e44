// src/commands/packages.rs
//! Install, remove and check commands

use anyhow::Result;
use ralph::acquire::{self, Summary};
use ralph::{progress::TaskProgress, PackageConfiguration, PackageDatabase, Scope};
use std::path::Path;
use tracing::info;

fn open_project(directory: &Path) -> Result<PackageDatabase> {
    Ok(PackageDatabase::open_scope(Scope::Project, directory)?)
}

/// Report a summary and surface the worst failure for the exit code
fn conclude(operation: &str, summary: Summary) -> Result<()> {
    for id in &summary.succeeded {
        println!("{operation} {id}");
    }
    for (query, err) in &summary.failed {
        eprintln!("{query}: {err}");
    }
    match summary.worst() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
}

/// Install packages into a group of the project database
pub fn cmd_install(
    packages: &[String],
    group: &str,
    config_items: &[String],
    directory: &Path,
) -> Result<()> {
    info!(count = packages.len(), group = %group, "installing packages");
    let db = open_project(directory)?;
    let config = PackageConfiguration::from_items(config_items)?;

    let summary = acquire::install(&db, packages, group, &config, |query, future| {
        TaskProgress::attach(query, future);
    });

    conclude("Installed", summary)
}

/// Remove packages from a group
pub fn cmd_remove(packages: &[String], group: &str, directory: &Path) -> Result<()> {
    info!(count = packages.len(), group = %group, "removing packages");
    let db = open_project(directory)?;
    conclude("Removed", acquire::remove(&db, packages, group))
}

/// Check that packages are installed in a group
pub fn cmd_check(packages: &[String], group: &str, directory: &Path) -> Result<()> {
    let db = open_project(directory)?;
    conclude("Installed", acquire::check(&db, packages, group))
}
