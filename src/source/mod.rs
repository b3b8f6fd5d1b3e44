// src/source/mod.rs

//! Package sources: named, synchronizable remote indexes
//!
//! A [`Source`] is a named mirror of a remote package index. The only
//! source type in v0.1 is `git`. Synchronization clones the remote on
//! first update (into a `.tmp` working copy swapped in on success) and
//! pulls the default branch afterwards, then re-scans the index tree
//! `packages/<name>/<version>.json` under the mirror. A failed update
//! leaves `last_updated` untouched and the mirror openable.

use crate::error::{Error, Result};
use crate::git::GitRepo;
use crate::package::Package;
use crate::task::{self, Future, Notifier};
use crate::version::{Version, VersionRequirement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Source type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Git,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Git => write!(f, "git"),
        }
    }
}

/// A named mirror of a remote package index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: SourceKind,

    pub url: String,

    /// Commit time of the last successful update; never advanced by a
    /// failed one
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Local working mirror, assigned by the owning database
    #[serde(skip)]
    pub mirror: PathBuf,
}

impl Source {
    /// A git source that has never been updated
    pub fn new_git(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Git,
            url: url.into(),
            last_updated: None,
            mirror: PathBuf::new(),
        }
    }

    /// Synchronize the mirror and re-index it
    ///
    /// Returns the source record carrying the new `last_updated`; the
    /// caller commits it to the owning database. Failure leaves the stored
    /// record untouched.
    pub fn update(&self) -> Future<Source> {
        let source = self.clone();
        task::spawn(move |notifier| {
            notifier.status(format!("Updating source {}...", source.name));
            source.sync_mirror(notifier)?;

            // Reindex: every metadata document must decode
            let packages = scan_packages(&source.mirror, &source.name)?;
            debug!(source = %source.name, count = packages.len(), "indexed mirror");

            let mut updated = source.clone();
            updated.last_updated = Some(Utc::now());
            Ok(updated)
        })
    }

    fn sync_mirror(&self, notifier: &Notifier) -> Result<()> {
        match self.kind {
            SourceKind::Git => self.sync_git(notifier),
        }
    }

    fn sync_git(&self, notifier: &Notifier) -> Result<()> {
        if self.mirror.join(".git").exists() {
            let repo = notifier.delegate(GitRepo::open(self.mirror.clone()))?;
            let branch = repo.default_branch()?;
            notifier.delegate(repo.pull(format!("origin/{branch}")))?;
        } else {
            // First clone lands in a sibling working copy and is swapped in
            // whole, so an interrupted clone never masquerades as a mirror.
            let tmp = staging_dir(&self.mirror)?;
            if tmp.exists() {
                fs::remove_dir_all(&tmp).map_err(|e| Error::filesystem(&tmp, e))?;
            }
            notifier.delegate(GitRepo::clone(tmp.clone(), self.url.clone()))?;
            fs::rename(&tmp, &self.mirror).map_err(|e| Error::filesystem(&self.mirror, e))?;
        }
        Ok(())
    }

    /// Enumerate all package metadata in the mirror
    ///
    /// A mirror that was never synchronized has no index and enumerates
    /// empty.
    pub fn packages(&self) -> Result<Vec<Package>> {
        scan_packages(&self.mirror, &self.name)
    }

    /// Packages matching `name` exactly whose version satisfies `req`,
    /// in ascending version order
    pub fn find_packages(&self, name: &str, req: &VersionRequirement) -> Result<Vec<Package>> {
        let mut found: Vec<Package> = self
            .packages()?
            .into_iter()
            .filter(|p| p.name == name && req.satisfies(&p.version))
            .collect();
        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }
}

/// Sibling staging directory for the initial clone
fn staging_dir(mirror: &Path) -> Result<PathBuf> {
    let name = mirror
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Logic(format!("mirror path {} has no name", mirror.display())))?;
    if let Some(parent) = mirror.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    Ok(mirror.with_file_name(format!("{name}.tmp")))
}

/// Scan `mirror/packages/<name>/<version>.json` into package metadata
///
/// Malformed documents, and documents whose directory or file name
/// disagrees with their content, fail the scan naming the offending path.
fn scan_packages(mirror: &Path, source: &str) -> Result<Vec<Package>> {
    let index_root = mirror.join("packages");
    if !index_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut packages = Vec::new();
    for entry in WalkDir::new(&index_root).min_depth(2).max_depth(2) {
        let entry = entry.map_err(|e| Error::Filesystem(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let format_error = |message: String| Error::SourceFormat {
            path: path.to_path_buf(),
            message,
        };

        let text = fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
        let package =
            Package::from_metadata(&text, source).map_err(|e| format_error(e.to_string()))?;

        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        if dir_name != Some(package.name.as_str()) {
            return Err(format_error(format!(
                "directory name does not match package name '{}'",
                package.name
            )));
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let file_version =
            Version::parse(stem).map_err(|e| format_error(e.to_string()))?;
        if file_version != package.version {
            return Err(format_error(format!(
                "file name version does not match package version '{}'",
                package.version
            )));
        }

        packages.push(package);
    }

    packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    Ok(packages)
}
