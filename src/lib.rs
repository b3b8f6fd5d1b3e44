// src/lib.rs

//! Ralph Package Manager
//!
//! Source-level package manager for native projects: packages are resolved
//! at version constraints from registered remote sources (git repositories
//! acting as indexes), materialized into a project-local vendor tree, and
//! tracked in scoped databases.
//!
//! # Architecture
//!
//! - Layered databases: project → user → system, each a directory of
//!   canonical JSON state plus one mirror per source
//! - Tasks: every long-running operation is a `Future` with progress,
//!   status, cancellation and typed failures
//! - Git-backed sources: mirrors are synchronized with libgit2 through a
//!   single driver module, authenticating via a process-wide broker
//! - Greedy resolution: a query picks the highest version satisfying its
//!   requirement across the scope chain

pub mod acquire;
pub mod db;
mod error;
pub mod git;
pub mod package;
pub mod progress;
pub mod project;
pub mod source;
pub mod task;
pub mod version;

pub use db::{parse_query, InstalledPackage, PackageDatabase, PackageGroup, Scope};
pub use error::{Error, Result};
pub use git::{
    set_credential_callback, CredentialKind, CredentialQuery, CredentialResponse, GitRepo,
};
pub use package::{Package, PackageConfiguration, PackageDependency, PackageId};
pub use project::{Project, ProjectGenerator};
pub use source::{Source, SourceKind};
pub use task::{Future, Notifier, Promise, TaskEvent, TaskState};
pub use version::{Version, VersionRequirement};
