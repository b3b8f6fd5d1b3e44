// src/commands/sources.rs
//! Source management commands

use anyhow::Result;
use ralph::{progress, PackageDatabase, Scope, Source};
use std::path::Path;
use tracing::info;

fn open(scope: &str, directory: &Path) -> Result<PackageDatabase> {
    let scope: Scope = scope.parse()?;
    Ok(PackageDatabase::open_scope(scope, directory)?)
}

fn last_updated_label(source: &Source) -> String {
    source
        .last_updated
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// List sources in the chosen database, plus outer scopes for visibility
pub fn cmd_sources_list(scope: &str, directory: &Path) -> Result<()> {
    let mut db = Some(open(scope, directory)?);
    while let Some(current) = db {
        println!("Package sources in the {} database:", current.scope());
        let sources = current.sources();
        if sources.is_empty() {
            println!("    Empty.");
            println!("    Use 'ralph sources add <name> <url>' to add a source!");
        }
        for source in &sources {
            println!(
                " * {} (type: {}, last updated: {})",
                source.name,
                source.kind,
                last_updated_label(source)
            );
        }
        db = current.parent().cloned();
        if db.is_some() {
            println!();
        }
    }
    Ok(())
}

/// Register a new source
pub fn cmd_sources_add(name: &str, url: &str, scope: &str, directory: &Path) -> Result<()> {
    let db = open(scope, directory)?;
    let source = db.register_source(Source::new_git(name, url))?;
    println!(
        "New source {} successfully registered. You may want to run 'ralph sources update {}' now.",
        source.name, source.name
    );
    Ok(())
}

/// Unregister a source and delete its mirror
pub fn cmd_sources_remove(name: &str, scope: &str, directory: &Path) -> Result<()> {
    let db = open(scope, directory)?;
    db.unregister_source(name)?;
    println!("Source {name} was successfully removed.");
    Ok(())
}

/// Show one source's details
pub fn cmd_sources_show(name: &str, scope: &str, directory: &Path) -> Result<()> {
    let db = open(scope, directory)?;
    let source = db.source(name)?;
    println!("Name: {}", source.name);
    println!("Type: {}", source.kind);
    println!("URL: {}", source.url);
    println!("Last updated: {}", last_updated_label(&source));
    Ok(())
}

/// Synchronize the named sources, or all of them
pub fn cmd_sources_update(names: &[String], scope: &str, directory: &Path) -> Result<()> {
    let db = open(scope, directory)?;
    let sources = if names.is_empty() {
        db.sources()
    } else {
        names
            .iter()
            .map(|name| db.source(name))
            .collect::<ralph::Result<Vec<_>>>()?
    };

    if sources.is_empty() {
        println!("No sources to update");
        return Ok(());
    }

    let mut first_failure = None;
    for source in sources {
        info!(source = %source.name, "updating");
        println!("Updating {} source {}...", source.kind, source.name);
        let future = db.update_source(&source.name)?;
        match progress::wait_rendered(&format!("Updating {}", source.name), &future) {
            Ok(updated) => println!(
                "Source {} updated (last updated: {})",
                updated.name,
                last_updated_label(&updated)
            ),
            Err(err) => {
                eprintln!("Failed to update {}: {err}", source.name);
                first_failure.get_or_insert(err);
            }
        }
    }

    match first_failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
