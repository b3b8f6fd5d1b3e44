// tests/acquisition.rs

//! Install/remove/check pipeline against local fixture remotes

mod common;

use common::{fixture_remote, project_db};
use ralph::acquire;
use ralph::{Error, PackageConfiguration, Source};

#[test]
fn test_install_materializes_source_and_picks_highest() {
    let (_remote_dir, url) = fixture_remote(&[("foo", "1.0"), ("foo", "1.2"), ("foo", "2.0")]);
    let (db_dir, db) = project_db();
    db.register_source(Source::new_git("origin", &url)).unwrap();
    db.update_source("origin").unwrap().wait().unwrap();

    // Drop the mirror: the install task must bring it back before
    // committing the group entry
    std::fs::remove_dir_all(db_dir.path().join("sources/origin")).unwrap();

    let summary = acquire::install(
        &db,
        &["foo@>=1.0,<2.0".to_string()],
        "tools",
        &PackageConfiguration::new(),
        |_, _| {},
    );
    assert!(summary.is_ok(), "install failed: {:?}", summary.failed);
    assert_eq!(summary.succeeded[0].version.to_string(), "1.2");
    assert!(db_dir.path().join("sources/origin/.git").exists());

    let installed = db.group("tools").installed();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].package.name, "foo");
}

#[test]
fn test_install_unmatched_version_reports_name_and_requirement() {
    let (_remote_dir, url) = fixture_remote(&[("foo", "1.0")]);
    let (_db_dir, db) = project_db();
    db.register_source(Source::new_git("origin", &url)).unwrap();
    db.update_source("origin").unwrap().wait().unwrap();

    let summary = acquire::install(
        &db,
        &["foo@9.9.9".to_string()],
        "",
        &PackageConfiguration::new(),
        |_, _| {},
    );
    assert!(!summary.is_ok());
    let err = &summary.failed[0].1;
    assert!(matches!(err, Error::NoMatchingVersion { .. }));
    let message = err.to_string();
    assert!(message.contains("foo"));
    assert!(message.contains("9.9.9"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_install_with_config_records_the_overlay() {
    let (_remote_dir, url) = fixture_remote(&[("foo", "1.0")]);
    let (_db_dir, db) = project_db();
    db.register_source(Source::new_git("origin", &url)).unwrap();
    db.update_source("origin").unwrap().wait().unwrap();

    let config = PackageConfiguration::from_items(&["shared=true", "lto=on"]).unwrap();
    let summary = acquire::install(&db, &["foo".to_string()], "", &config, |_, _| {});
    assert!(summary.is_ok());

    let installed = db.group("").installed();
    assert_eq!(installed[0].config.get("shared"), Some("true"));
    assert_eq!(installed[0].config.get("lto"), Some("on"));
}

#[test]
fn test_check_and_remove_follow_install() {
    let (_remote_dir, url) = fixture_remote(&[("foo", "1.0"), ("bar", "0.5")]);
    let (_db_dir, db) = project_db();
    db.register_source(Source::new_git("origin", &url)).unwrap();
    db.update_source("origin").unwrap().wait().unwrap();

    let queries = ["foo".to_string(), "bar".to_string()];
    let summary = acquire::install(&db, &queries, "", &PackageConfiguration::new(), |_, _| {});
    assert!(summary.is_ok());

    assert!(acquire::check(&db, &queries, "").is_ok());

    let removed = acquire::remove(&db, &["foo".to_string()], "");
    assert!(removed.is_ok());

    let check = acquire::check(&db, &queries, "");
    assert_eq!(check.failed.len(), 1);
    assert!(matches!(check.failed[0].1, Error::NotInstalled(_)));
    assert_eq!(check.succeeded.len(), 1);
}

#[test]
fn test_pipeline_continues_after_unknown_package() {
    let (_remote_dir, url) = fixture_remote(&[("foo", "1.0")]);
    let (_db_dir, db) = project_db();
    db.register_source(Source::new_git("origin", &url)).unwrap();
    db.update_source("origin").unwrap().wait().unwrap();

    let summary = acquire::install(
        &db,
        &["ghost".to_string(), "foo".to_string()],
        "",
        &PackageConfiguration::new(),
        |_, _| {},
    );
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.succeeded.len(), 1);
    assert!(matches!(summary.failed[0].1, Error::UnknownPackage(_)));
}
