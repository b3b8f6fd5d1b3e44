// tests/common/mod.rs

//! Shared fixtures for integration tests: throwaway databases and local
//! git remotes serving package indexes, so no test touches the network.

#![allow(dead_code)]

use git2::Repository;
use ralph::{PackageDatabase, Scope};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create an empty project-scope database in a scratch directory.
///
/// Returns (TempDir, database) - keep the TempDir alive to prevent cleanup.
pub fn project_db() -> (TempDir, PackageDatabase) {
    let dir = tempfile::tempdir().unwrap();
    let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
    (dir, db)
}

/// Create a local git remote carrying the given (name, version) index.
///
/// Returns (TempDir, url) - the url is a plain path usable by the git
/// transport.
pub fn fixture_remote(packages: &[(&str, &str)]) -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    write_index(dir.path(), packages);
    commit_all(&repo, "index");
    let url = dir.path().to_str().unwrap().to_string();
    (dir, url)
}

/// Write package metadata files under `<root>/packages/<name>/<version>.json`
pub fn write_index(root: &Path, packages: &[(&str, &str)]) {
    for (name, version) in packages {
        let dir = root.join("packages").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{version}.json")),
            format!("{{\"name\": \"{name}\", \"version\": \"{version}\"}}\n"),
        )
        .unwrap();
    }
}

/// Stage everything in the work tree and commit it
pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = git2::Signature::now("Fixture", "fixture@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap();
}
