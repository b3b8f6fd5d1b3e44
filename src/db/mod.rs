// src/db/mod.rs

//! Scoped package databases
//!
//! A [`PackageDatabase`] owns one on-disk root holding `sources.json`, a
//! `groups.json` map of installed sets, and a mirror directory per source.
//! Databases chain outward (project → user → system): package queries union
//! the chain, while source lookup and every mutation target only the
//! database they are invoked on.
//!
//! Every persisted mutation serializes the in-memory state to a temporary
//! file next to the target and renames over it, under a per-database mutex
//! held for the persistence step. Readers observe the pre- or post-state,
//! never a torn document. Concurrent writers from other processes are not
//! supported.

pub mod paths;

pub use paths::Scope;

use crate::error::{Error, Result};
use crate::package::{Package, PackageConfiguration, PackageId};
use crate::source::Source;
use crate::task::{self, Future};
use crate::version::VersionRequirement;
use parking_lot::Mutex;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SOURCES_FILE: &str = "sources.json";
const GROUPS_FILE: &str = "groups.json";
const MIRRORS_DIR: &str = "sources";

/// One entry of a group's installed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub package: PackageId,
    #[serde(default)]
    pub config: PackageConfiguration,
}

struct DbState {
    sources: Vec<Source>,
    groups: BTreeMap<String, Vec<InstalledPackage>>,
}

struct DbInner {
    scope: Scope,
    root: PathBuf,
    /// Next outer scope; lookup only, never mutated through
    parent: Option<PackageDatabase>,
    state: Mutex<DbState>,
}

/// A scoped registry of package sources and installation groups
pub struct PackageDatabase {
    inner: Arc<DbInner>,
}

impl Clone for PackageDatabase {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PackageDatabase {
    /// Create or open the database at `root`; idempotent
    pub fn create(scope: Scope, root: impl Into<PathBuf>) -> Result<Self> {
        Self::create_with_parent(scope, root, None)
    }

    /// Create or open, chaining to the next outer scope
    pub fn create_with_parent(
        scope: Scope,
        root: impl Into<PathBuf>,
        parent: Option<PackageDatabase>,
    ) -> Result<Self> {
        Self::build(scope, root.into(), parent, true)?
            .ok_or_else(|| Error::Logic("create did not produce a database".into()))
    }

    /// Open the database at `root` if one exists
    pub fn get(scope: Scope, root: impl Into<PathBuf>) -> Result<Option<Self>> {
        Self::build(scope, root.into(), None, false)
    }

    fn get_with_parent(
        scope: Scope,
        root: impl Into<PathBuf>,
        parent: Option<PackageDatabase>,
    ) -> Result<Option<Self>> {
        Self::build(scope, root.into(), parent, false)
    }

    /// Open the database for `scope`, creating it on demand and attaching
    /// whichever outer scopes already exist
    pub fn open_scope(scope: Scope, project_root: &Path) -> Result<Self> {
        match scope {
            Scope::System => Self::create(Scope::System, paths::system_dir()),
            Scope::User => {
                let root = paths::user_dir().ok_or_else(|| {
                    Error::DatabaseUnavailable("no user configuration directory".into())
                })?;
                let system = Self::get(Scope::System, paths::system_dir())?;
                Self::create_with_parent(Scope::User, root, system)
            }
            Scope::Project => {
                let system = Self::get(Scope::System, paths::system_dir())?;
                // The chain skips a scope whose database was never created
                let outer = match paths::user_dir() {
                    Some(root) => {
                        Self::get_with_parent(Scope::User, root, system.clone())?.or(system)
                    }
                    None => system,
                };
                Self::create_with_parent(Scope::Project, paths::project_dir(project_root), outer)
            }
        }
    }

    fn build(
        scope: Scope,
        root: PathBuf,
        parent: Option<PackageDatabase>,
        create: bool,
    ) -> Result<Option<Self>> {
        let sources_path = root.join(SOURCES_FILE);
        if !sources_path.exists() && !create {
            return Ok(None);
        }

        if create {
            fs::create_dir_all(&root).map_err(|e| Error::filesystem(&root, e))?;
        }

        let mut sources: Vec<Source> = load_json(&sources_path)?.unwrap_or_default();
        let groups: BTreeMap<String, Vec<InstalledPackage>> =
            load_json(&root.join(GROUPS_FILE))?.unwrap_or_default();
        for source in &mut sources {
            source.mirror = root.join(MIRRORS_DIR).join(&source.name);
        }

        let db = Self {
            inner: Arc::new(DbInner {
                scope,
                root,
                parent,
                state: Mutex::new(DbState { sources, groups }),
            }),
        };

        if create && !sources_path.exists() {
            let state = db.inner.state.lock();
            db.persist_sources(&state)?;
            db.persist_groups(&state)?;
            debug!(scope = %scope, root = %db.inner.root.display(), "created database");
        }

        Ok(Some(db))
    }

    pub fn scope(&self) -> Scope {
        self.inner.scope
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// The next outer scope, when one is attached
    pub fn parent(&self) -> Option<&PackageDatabase> {
        self.inner.parent.as_ref()
    }

    /// Snapshot of the registered sources, in registration order
    pub fn sources(&self) -> Vec<Source> {
        self.inner.state.lock().sources.clone()
    }

    /// Look up a source by name in this database only (no fallthrough)
    pub fn source(&self, name: &str) -> Result<Source> {
        self.inner
            .state
            .lock()
            .sources
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| Error::UnknownSource(name.to_string()))
    }

    /// Register a source; its mirror directory lives under this database
    ///
    /// The name must be unique within this database. A collision with an
    /// outer scope is permitted with a warning.
    pub fn register_source(&self, mut source: Source) -> Result<Source> {
        validate_source_name(&source.name)?;
        source.mirror = self.inner.root.join(MIRRORS_DIR).join(&source.name);

        let mut state = self.inner.state.lock();
        if state.sources.iter().any(|s| s.name == source.name) {
            return Err(Error::SourceAlreadyRegistered(source.name));
        }
        if let Some(outer) = self.chain_source(&source.name) {
            warn!(
                "source '{}' shadows the one registered in the {} database",
                source.name, outer
            );
        }

        state.sources.push(source.clone());
        self.persist_sources(&state)?;
        info!(source = %source.name, url = %source.url, "registered source");
        Ok(source)
    }

    /// Remove a source and delete its mirror directory
    pub fn unregister_source(&self, name: &str) -> Result<()> {
        let mirror = {
            let mut state = self.inner.state.lock();
            let index = state
                .sources
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| Error::UnknownSource(name.to_string()))?;
            let source = state.sources.remove(index);
            self.persist_sources(&state)?;
            source.mirror
        };

        if mirror.exists() {
            fs::remove_dir_all(&mirror).map_err(|e| Error::filesystem(&mirror, e))?;
        }
        info!(source = name, "unregistered source");
        Ok(())
    }

    /// Scope label of the nearest outer database registering `name`
    fn chain_source(&self, name: &str) -> Option<Scope> {
        let mut db = self.parent().cloned();
        while let Some(current) = db {
            if current.source(name).is_ok() {
                return Some(current.scope());
            }
            db = current.parent().cloned();
        }
        None
    }

    /// Synchronize a source and commit the new `last_updated` on success
    ///
    /// The returned future mirrors the update's progress and status and
    /// forwards cancellation into it. Failure leaves the stored record
    /// untouched; the mirror may be partially updated but stays openable.
    pub fn update_source(&self, name: &str) -> Result<Future<Source>> {
        let source = self.source(name)?;
        let db = self.clone();
        Ok(task::spawn(move |notifier| {
            let updated = notifier.delegate(source.update())?;
            db.commit_source_update(updated)
        }))
    }

    fn commit_source_update(&self, updated: Source) -> Result<Source> {
        let mut state = self.inner.state.lock();
        let index = state
            .sources
            .iter()
            .position(|s| s.name == updated.name)
            .ok_or_else(|| Error::UnknownSource(updated.name.clone()))?;
        state.sources[index].last_updated = updated.last_updated;
        let snapshot = state.sources[index].clone();
        self.persist_sources(&state)?;
        info!(source = %snapshot.name, "source updated");
        Ok(snapshot)
    }

    /// Installation group handle; groups come into being on first install
    pub fn group(&self, name: impl Into<String>) -> PackageGroup {
        PackageGroup {
            db: self.clone(),
            name: name.into(),
        }
    }

    /// All package names visible from this scope outward, sorted
    pub fn package_names(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        let mut db = Some(self.clone());
        while let Some(current) = db {
            for source in current.sources() {
                for package in source.packages()? {
                    names.insert(package.name);
                }
            }
            db = current.parent().cloned();
        }
        Ok(names.into_iter().collect())
    }

    /// Packages matching `name` and `req` across the scope chain,
    /// ascending by version
    pub fn find_packages(&self, name: &str, req: &VersionRequirement) -> Result<Vec<Package>> {
        let mut found = Vec::new();
        let mut db = Some(self.clone());
        while let Some(current) = db {
            for source in current.sources() {
                found.extend(source.find_packages(name, req)?);
            }
            db = current.parent().cloned();
        }
        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }

    /// Resolve `name[@req]` to the highest satisfying package
    pub fn resolve(&self, query: &str) -> Result<Package> {
        let (name, requirement) = parse_query(query)?;
        let mut candidates = self.find_packages(&name, &requirement)?;
        match candidates.pop() {
            Some(package) => Ok(package),
            None => {
                if self
                    .find_packages(&name, &VersionRequirement::any())?
                    .is_empty()
                {
                    Err(Error::UnknownPackage(name))
                } else {
                    Err(Error::NoMatchingVersion {
                        name,
                        requirement: requirement.to_string(),
                    })
                }
            }
        }
    }

    /// Package names matching a `*`/`?` wildcard, case-insensitively
    pub fn search(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = wildcard_matcher(pattern)?;
        Ok(self
            .package_names()?
            .into_iter()
            .filter(|name| matcher.is_match(name))
            .collect())
    }

    fn persist_sources(&self, state: &DbState) -> Result<()> {
        write_json_atomic(&self.inner.root.join(SOURCES_FILE), &state.sources)
    }

    fn persist_groups(&self, state: &DbState) -> Result<()> {
        write_json_atomic(&self.inner.root.join(GROUPS_FILE), &state.groups)
    }
}

/// A named installation scope within one database
pub struct PackageGroup {
    db: PackageDatabase,
    name: String,
}

impl PackageGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record an installation
    ///
    /// Idempotent for an equal (package, configuration) pair; an install
    /// with a different configuration replaces the recorded one, keeping at
    /// most one entry per package identity.
    pub fn install(&self, package: &Package, config: &PackageConfiguration) -> Result<()> {
        let id = package.id();
        let mut state = self.db.inner.state.lock();
        let entries = state.groups.entry(self.name.clone()).or_default();
        match entries.iter().position(|e| e.package == id) {
            Some(index) if entries[index].config == *config => return Ok(()),
            Some(index) => entries[index].config = config.clone(),
            None => entries.push(InstalledPackage {
                package: id,
                config: config.clone(),
            }),
        }
        self.db.persist_groups(&state)?;
        info!(package = %package, group = %self.name, "installed");
        Ok(())
    }

    /// Remove an installation
    pub fn remove(&self, package: &Package) -> Result<()> {
        let id = package.id();
        let mut state = self.db.inner.state.lock();
        let entries = state.groups.entry(self.name.clone()).or_default();
        let index = entries
            .iter()
            .position(|e| e.package == id)
            .ok_or_else(|| Error::NotInstalled(package.name.clone()))?;
        entries.remove(index);
        self.db.persist_groups(&state)?;
        info!(package = %package, group = %self.name, "removed");
        Ok(())
    }

    pub fn is_installed(&self, package: &Package) -> bool {
        let id = package.id();
        self.db
            .inner
            .state
            .lock()
            .groups
            .get(&self.name)
            .map(|entries| entries.iter().any(|e| e.package == id))
            .unwrap_or(false)
    }

    /// Snapshot of the installed set
    pub fn installed(&self) -> Vec<InstalledPackage> {
        self.db
            .inner
            .state
            .lock()
            .groups
            .get(&self.name)
            .cloned()
            .unwrap_or_default()
    }
}

/// Split a `name[@requirement]` query
pub fn parse_query(query: &str) -> Result<(String, VersionRequirement)> {
    let (name, requirement) = match query.split_once('@') {
        Some((name, req)) => (name, VersionRequirement::parse(req)?),
        None => (query, VersionRequirement::any()),
    };
    if name.is_empty() {
        return Err(Error::BadArgument(format!(
            "package query '{query}' has no name"
        )));
    }
    Ok((name.to_string(), requirement))
}

/// Serialize `value` canonically and rename it over `path`
///
/// Canonical form: sorted keys, two-space indent, LF, trailing newline.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Logic(format!("no parent directory for {}", path.display())))?;

    // Round-tripping through Value sorts object keys at every level
    let canonical = serde_json::to_value(value)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .map_err(|e| Error::Logic(format!("serialization failed: {e}")))?;

    let mut file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| Error::filesystem(parent, e))?;
    file.write_all(canonical.as_bytes())
        .and_then(|_| file.write_all(b"\n"))
        .map_err(|e| Error::filesystem(path, e))?;
    file.persist(path)
        .map_err(|e| Error::filesystem(path, e.error))?;
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| Error::DatabaseUnavailable(format!("{}: {e}", path.display())))
}

fn validate_source_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::BadArgument("source name is empty".into()));
    }
    if name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(Error::BadArgument(format!(
            "source name '{name}' is not a plain directory name"
        )));
    }
    Ok(())
}

/// Compile a `*`/`?` wildcard into a case-insensitive substring matcher
fn wildcard_matcher(pattern: &str) -> Result<regex::Regex> {
    let escaped = regex::escape(pattern)
        .replace("\\*", ".*")
        .replace("\\?", ".");
    RegexBuilder::new(&escaped)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::BadArgument(format!("invalid search pattern '{pattern}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn metadata(name: &str, version: &str) -> String {
        format!("{{\"name\": \"{name}\", \"version\": \"{version}\"}}")
    }

    /// Write package metadata straight into a registered source's mirror
    fn seed_mirror(db: &PackageDatabase, source: &str, name: &str, version: &str) {
        let dir = db
            .root()
            .join(MIRRORS_DIR)
            .join(source)
            .join("packages")
            .join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{version}.json")), metadata(name, version)).unwrap();
    }

    fn package(name: &str, version: &str, source: &str) -> Package {
        Package::from_metadata(&metadata(name, version), source).unwrap()
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = tempdir().unwrap();
        let first = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        first
            .register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();

        let second = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        assert_eq!(second.sources().len(), 1);
        assert_eq!(second.sources()[0].name, "origin");
    }

    #[test]
    fn test_get_absent_returns_none() {
        let dir = tempdir().unwrap();
        assert!(PackageDatabase::get(Scope::Project, dir.path().join("missing"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        db.register_source(Source::new_git("origin", "https://a")).unwrap();
        assert!(matches!(
            db.register_source(Source::new_git("origin", "https://b")),
            Err(Error::SourceAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_register_rejects_path_like_names() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        assert!(db.register_source(Source::new_git("", "https://a")).is_err());
        assert!(db
            .register_source(Source::new_git("../escape", "https://a"))
            .is_err());
    }

    #[test]
    fn test_unregister_restores_prior_state_and_removes_mirror() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        let before = db.sources();

        db.register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        seed_mirror(&db, "origin", "foo", "1.0");
        let mirror = dir.path().join(MIRRORS_DIR).join("origin");
        assert!(mirror.exists());

        db.unregister_source("origin").unwrap();
        assert_eq!(db.sources(), before);
        assert!(!mirror.exists());

        assert!(matches!(
            db.unregister_source("origin"),
            Err(Error::UnknownSource(_))
        ));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
            db.register_source(Source::new_git("origin", "https://example/repo.git"))
                .unwrap();
            db.group("tools")
                .install(&package("foo", "1.0", "origin"), &PackageConfiguration::new())
                .unwrap();
        }

        let db = PackageDatabase::get(Scope::Project, dir.path())
            .unwrap()
            .expect("database exists");
        assert_eq!(db.sources()[0].name, "origin");
        assert!(db
            .group("tools")
            .is_installed(&package("foo", "1.0", "origin")));
    }

    #[test]
    fn test_persisted_documents_are_canonical() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        db.register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();

        let first = fs::read_to_string(dir.path().join(SOURCES_FILE)).unwrap();
        assert!(first.ends_with('\n'));
        assert!(!first.contains('\r'));

        // Reload and rewrite: canonical form is byte-stable
        let reopened = PackageDatabase::get(Scope::Project, dir.path())
            .unwrap()
            .unwrap();
        let state = reopened.inner.state.lock();
        reopened.persist_sources(&state).unwrap();
        drop(state);
        let second = fs::read_to_string(dir.path().join(SOURCES_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_install_is_idempotent_and_replaces_config() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        let group = db.group("");
        let pkg = package("foo", "1.0", "origin");

        let config = PackageConfiguration::from_items(&["shared=true"]).unwrap();
        group.install(&pkg, &config).unwrap();
        group.install(&pkg, &config).unwrap();
        assert_eq!(group.installed().len(), 1);

        let other = PackageConfiguration::from_items(&["shared=false"]).unwrap();
        group.install(&pkg, &other).unwrap();
        let installed = group.installed();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].config.get("shared"), Some("false"));
    }

    #[test]
    fn test_group_remove() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        let group = db.group("");
        let pkg = package("foo", "1.0", "origin");

        assert!(matches!(group.remove(&pkg), Err(Error::NotInstalled(_))));

        group.install(&pkg, &PackageConfiguration::new()).unwrap();
        assert!(group.is_installed(&pkg));
        group.remove(&pkg).unwrap();
        assert!(!group.is_installed(&pkg));
    }

    #[test]
    fn test_resolve_picks_highest_matching() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        db.register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        for version in ["1.0", "1.2", "2.0"] {
            seed_mirror(&db, "origin", "foo", version);
        }

        let package = db.resolve("foo@>=1.0,<2.0").unwrap();
        assert_eq!(package.version.to_string(), "1.2");

        let any = db.resolve("foo").unwrap();
        assert_eq!(any.version.to_string(), "2.0");
    }

    #[test]
    fn test_resolve_distinguishes_unknown_from_unmatched() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        db.register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        seed_mirror(&db, "origin", "foo", "1.0");

        assert!(matches!(
            db.resolve("ghost"),
            Err(Error::UnknownPackage(name)) if name == "ghost"
        ));
        match db.resolve("foo@9.9.9") {
            Err(Error::NoMatchingVersion { name, requirement }) => {
                assert_eq!(name, "foo");
                assert!(requirement.contains("9.9.9"));
            }
            other => panic!("expected NoMatchingVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_queries_union_the_scope_chain() {
        let system_dir = tempdir().unwrap();
        let system = PackageDatabase::create(Scope::System, system_dir.path()).unwrap();
        system
            .register_source(Source::new_git("base", "https://example/base.git"))
            .unwrap();
        seed_mirror(&system, "base", "foo", "1.0");

        let project_dir = tempdir().unwrap();
        let project = PackageDatabase::create_with_parent(
            Scope::Project,
            project_dir.path(),
            Some(system.clone()),
        )
        .unwrap();
        project
            .register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        seed_mirror(&project, "origin", "foo", "1.2");

        let found = project
            .find_packages("foo", &VersionRequirement::any())
            .unwrap();
        let versions: Vec<String> = found.iter().map(|p| p.version.to_string()).collect();
        assert_eq!(versions, ["1.0", "1.2"]);

        // Source lookup does not fall through to the parent
        assert!(project.source("base").is_err());
        assert!(system.source("base").is_ok());

        // The chain resolves to the project's higher version
        assert_eq!(project.resolve("foo").unwrap().source, "origin");
    }

    #[test]
    fn test_search_wildcards() {
        let dir = tempdir().unwrap();
        let db = PackageDatabase::create(Scope::Project, dir.path()).unwrap();
        db.register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        for name in ["libfoo", "libbar", "tool"] {
            seed_mirror(&db, "origin", name, "1.0");
        }

        assert_eq!(db.search("lib*").unwrap(), ["libbar", "libfoo"]);
        assert_eq!(db.search("LIBFOO").unwrap(), ["libfoo"]);
        assert_eq!(db.search("t??l").unwrap(), ["tool"]);
    }

    #[test]
    fn test_parse_query_shapes() {
        assert_eq!(parse_query("foo").unwrap().0, "foo");
        let (name, req) = parse_query("foo@>=1.0").unwrap();
        assert_eq!(name, "foo");
        assert!(!req.is_any());
        assert!(parse_query("@1.0").is_err());
        assert!(parse_query("foo@nonsense").is_err());
    }
}
