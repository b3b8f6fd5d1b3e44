// src/acquire.rs

//! Acquisition pipeline: install, remove and check orchestration
//!
//! Each invocation resolves its package queries against the scope chain and
//! applies them in input order. Per-package failures are collected rather
//! than aborting the run; the caller maps the summary onto the process exit
//! code. Installs run as tasks: a query that resolution cannot answer from
//! the indexed mirrors first materializes any never-cloned mirror in the
//! chain, with that work delegated into the install's progress stream, and
//! is then resolved again. Remove and check touch no network.

use crate::db::PackageDatabase;
use crate::error::{Error, Result};
use crate::package::{PackageConfiguration, PackageId};
use crate::task::{self, Future, Notifier};
use tracing::{info, warn};

/// Outcome of one multi-package invocation
#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: Vec<PackageId>,
    pub failed: Vec<(String, Error)>,
}

impl Summary {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// The failure that should drive the process exit code
    ///
    /// A logic error outranks user-facing failures.
    pub fn worst(&self) -> Option<&Error> {
        self.failed
            .iter()
            .map(|(_, err)| err)
            .find(|err| matches!(err, Error::Logic(_)))
            .or_else(|| self.failed.first().map(|(_, err)| err))
    }

    fn record(&mut self, query: &str, result: Result<PackageId>) {
        match result {
            Ok(id) => self.succeeded.push(id),
            Err(err) => {
                warn!(query, error = %err, "operation failed");
                self.failed.push((query.to_string(), err));
            }
        }
    }
}

/// Install every `name[@req]` query into `group`
///
/// `observe` is called with each spawned install task so the caller can
/// attach progress rendering before the pipeline blocks on it.
pub fn install(
    db: &PackageDatabase,
    queries: &[String],
    group: &str,
    config: &PackageConfiguration,
    mut observe: impl FnMut(&str, &Future<PackageId>),
) -> Summary {
    let mut summary = Summary::default();
    for query in queries {
        let future = install_task(db, query, group, config);
        observe(query, &future);
        summary.record(query, future.wait());
    }
    summary
}

/// Resolve and install one `name[@req]` query as a task
///
/// A query that fails to resolve may be answered by a source whose mirror
/// has never been materialized; those mirrors are fetched first, with their
/// progress mirrored upward, and resolution is retried against the fresh
/// index.
pub fn install_task(
    db: &PackageDatabase,
    query: &str,
    group: &str,
    config: &PackageConfiguration,
) -> Future<PackageId> {
    let db = db.clone();
    let query = query.to_string();
    let group = group.to_string();
    let config = config.clone();
    task::spawn(move |notifier| {
        let package = match db.resolve(&query) {
            Ok(package) => package,
            Err(err @ (Error::UnknownPackage(_) | Error::NoMatchingVersion { .. })) => {
                if materialize_unsynced(&db, notifier)? {
                    db.resolve(&query)?
                } else {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        };

        notifier.status(format!("Installing {package}..."));
        notifier.check_canceled()?;
        db.group(&group).install(&package, &config)?;
        info!(package = %package, group = %group, "install committed");
        Ok(package.id())
    })
}

/// Fetch every source in the chain whose mirror was never cloned
///
/// Each update commits through the database that owns the source. Returns
/// whether any mirror was materialized.
fn materialize_unsynced(db: &PackageDatabase, notifier: &Notifier) -> Result<bool> {
    let mut materialized = false;
    let mut current = Some(db.clone());
    while let Some(candidate) = current {
        for source in candidate.sources() {
            if !source.mirror.join(".git").exists() {
                notifier.delegate(candidate.update_source(&source.name)?)?;
                materialized = true;
            }
        }
        current = candidate.parent().cloned();
    }
    Ok(materialized)
}

/// Remove every query's package from `group`
pub fn remove(db: &PackageDatabase, queries: &[String], group: &str) -> Summary {
    let mut summary = Summary::default();
    for query in queries {
        let result = db
            .resolve(query)
            .and_then(|package| db.group(group).remove(&package).map(|_| package.id()));
        summary.record(query, result);
    }
    summary
}

/// Verify every query's package is installed in `group`
pub fn check(db: &PackageDatabase, queries: &[String], group: &str) -> Summary {
    let mut summary = Summary::default();
    for query in queries {
        let result = db.resolve(query).and_then(|package| {
            if db.group(group).is_installed(&package) {
                Ok(package.id())
            } else {
                Err(Error::NotInstalled(package.name.clone()))
            }
        });
        summary.record(query, result);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Scope;
    use crate::source::Source;
    use std::fs;
    use tempfile::tempdir;

    /// Database with one source whose mirror is already materialized
    fn seeded_db(root: &std::path::Path, versions: &[&str]) -> PackageDatabase {
        let db = PackageDatabase::create(Scope::Project, root).unwrap();
        let source = db
            .register_source(Source::new_git("origin", "https://example/repo.git"))
            .unwrap();
        fs::create_dir_all(source.mirror.join(".git")).unwrap();
        for version in versions {
            let dir = source.mirror.join("packages").join("foo");
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join(format!("{version}.json")),
                format!("{{\"name\": \"foo\", \"version\": \"{version}\"}}"),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn test_install_resolves_highest_matching() {
        let dir = tempdir().unwrap();
        let db = seeded_db(dir.path(), &["1.0", "1.2", "2.0"]);

        let summary = install(
            &db,
            &["foo@>=1.0,<2.0".to_string()],
            "",
            &PackageConfiguration::new(),
            |_, _| {},
        );
        assert!(summary.is_ok());
        assert_eq!(summary.succeeded[0].version.to_string(), "1.2");
        assert!(db.group("").is_installed(&db.resolve("foo@1.2").unwrap()));
    }

    #[test]
    fn test_install_continues_past_failures() {
        let dir = tempdir().unwrap();
        let db = seeded_db(dir.path(), &["1.0"]);

        let summary = install(
            &db,
            &["ghost".to_string(), "foo".to_string()],
            "",
            &PackageConfiguration::new(),
            |_, _| {},
        );
        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(matches!(summary.failed[0].1, Error::UnknownPackage(_)));
        assert!(matches!(summary.worst(), Some(Error::UnknownPackage(_))));
    }

    #[test]
    fn test_unmatched_version_reports_both_name_and_requirement() {
        let dir = tempdir().unwrap();
        let db = seeded_db(dir.path(), &["1.0"]);

        let summary = install(
            &db,
            &["foo@9.9.9".to_string()],
            "",
            &PackageConfiguration::new(),
            |_, _| {},
        );
        let message = summary.failed[0].1.to_string();
        assert!(message.contains("foo"));
        assert!(message.contains("9.9.9"));
    }

    #[test]
    fn test_remove_and_check_round_trip() {
        let dir = tempdir().unwrap();
        let db = seeded_db(dir.path(), &["1.0"]);
        let queries = ["foo".to_string()];

        assert!(!check(&db, &queries, "").is_ok());

        let summary = install(&db, &queries, "", &PackageConfiguration::new(), |_, _| {});
        assert!(summary.is_ok());
        assert!(check(&db, &queries, "").is_ok());

        assert!(remove(&db, &queries, "").is_ok());
        assert!(matches!(
            check(&db, &queries, "").failed[0].1,
            Error::NotInstalled(_)
        ));
    }
}
