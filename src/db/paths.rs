// src/db/paths.rs
//! Scope directory discovery for ralph databases

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Database scope, innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Project,
    User,
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project => write!(f, "project"),
            Scope::User => write!(f, "user"),
            Scope::System => write!(f, "system"),
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "project" => Ok(Scope::Project),
            "user" => Ok(Scope::User),
            "system" => Ok(Scope::System),
            other => Err(Error::BadArgument(format!("unknown scope '{other}'"))),
        }
    }
}

/// OS-wide database directory
pub fn system_dir() -> PathBuf {
    std::env::var("RALPH_SYSTEM_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/etc/ralph"))
}

/// Per-user database directory, `None` when the platform has no
/// configuration directory
pub fn user_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("RALPH_USER_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs_next::config_dir().map(|dir| dir.join("ralph"))
}

/// Project-scope database directory: the vendor tree
pub fn project_dir(project_root: &Path) -> PathBuf {
    project_root.join("vendor")
}

/// Root directory for a database of the given scope
pub fn database_path(scope: Scope, project_root: &Path) -> Option<PathBuf> {
    match scope {
        Scope::Project => Some(project_dir(project_root)),
        Scope::User => user_dir(),
        Scope::System => Some(system_dir()),
    }
}
