// src/project/mod.rs

//! Project manifests and scaffolding
//!
//! A ralph project is a directory with a `ralph.json` manifest carrying the
//! same schema as a package metadata file. Loading doubles as verification.
//! The generator behind `ralph new` writes the manifest, a build-system
//! stub and initializes version control.

use crate::db::write_json_atomic;
use crate::error::{Error, Result};
use crate::git::GitRepo;
use crate::package::Package;
use crate::task::{self, Future};
use crate::version::Version;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Manifest file name inside a project directory
pub const MANIFEST_FILE: &str = "ralph.json";

/// A loaded, validated project
#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
    package: Package,
}

impl Project {
    /// Load and validate the manifest in `dir`
    pub fn load(dir: &Path) -> Result<Project> {
        let path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| Error::filesystem(&path, e))?;
        let package = Package::from_metadata(&text, "project")?;
        Ok(Project {
            dir: dir.to_path_buf(),
            package,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn package(&self) -> &Package {
        &self.package
    }
}

/// Build system scaffolded into a new project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
    Cmake,
    None,
}

impl FromStr for BuildSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cmake" => Ok(BuildSystem::Cmake),
            "none" => Ok(BuildSystem::None),
            other => Err(Error::BadArgument(format!("unknown build system '{other}'"))),
        }
    }
}

/// Version control system initialized for a new project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionControl {
    Git,
    None,
}

impl FromStr for VersionControl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(VersionControl::Git),
            "none" => Ok(VersionControl::None),
            other => Err(Error::BadArgument(format!(
                "unknown version control system '{other}'"
            ))),
        }
    }
}

/// Scaffolds a new project directory
#[derive(Debug, Clone)]
pub struct ProjectGenerator {
    name: String,
    dir: PathBuf,
    build_system: BuildSystem,
    version_control: VersionControl,
}

impl ProjectGenerator {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            build_system: BuildSystem::Cmake,
            version_control: VersionControl::Git,
        }
    }

    pub fn build_system(mut self, build_system: BuildSystem) -> Self {
        self.build_system = build_system;
        self
    }

    pub fn version_control(mut self, version_control: VersionControl) -> Self {
        self.version_control = version_control;
        self
    }

    /// Generate the project skeleton
    pub fn generate(self) -> Future<Project> {
        task::spawn(move |notifier| {
            if self.name.is_empty() {
                return Err(Error::BadArgument("project name is empty".into()));
            }
            let manifest = self.dir.join(MANIFEST_FILE);
            if manifest.exists() {
                return Err(Error::BadArgument(format!(
                    "{} is already a ralph project",
                    self.dir.display()
                )));
            }

            notifier.status(format!("Creating project {}...", self.name));
            fs::create_dir_all(&self.dir).map_err(|e| Error::filesystem(&self.dir, e))?;

            let package = Package {
                name: self.name.clone(),
                version: Version::new(vec![0, 1, 0], None),
                dependencies: Vec::new(),
                flags: Default::default(),
                source: "project".to_string(),
            };
            write_json_atomic(&manifest, &package)?;

            if self.build_system == BuildSystem::Cmake {
                let cmake = self.dir.join("CMakeLists.txt");
                if !cmake.exists() {
                    fs::write(
                        &cmake,
                        format!(
                            "cmake_minimum_required(VERSION 3.16)\nproject({} VERSION 0.1.0)\n",
                            self.name
                        ),
                    )
                    .map_err(|e| Error::filesystem(&cmake, e))?;
                }
            }

            if self.version_control == VersionControl::Git {
                notifier.delegate(GitRepo::init(self.dir.clone()))?;
            }

            info!(project = %self.name, dir = %self.dir.display(), "project created");
            Ok(Project {
                dir: self.dir,
                package,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_then_load() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app");

        let project = ProjectGenerator::new("app", &target)
            .build_system(BuildSystem::Cmake)
            .version_control(VersionControl::Git)
            .generate()
            .wait()
            .unwrap();
        assert_eq!(project.name(), "app");
        assert!(target.join(MANIFEST_FILE).exists());
        assert!(target.join("CMakeLists.txt").exists());
        assert!(target.join(".git").exists());

        let loaded = Project::load(&target).unwrap();
        assert_eq!(loaded.name(), "app");
        assert_eq!(loaded.package().version.to_string(), "0.1.0");
    }

    #[test]
    fn test_generate_refuses_existing_project() {
        let dir = tempdir().unwrap();
        ProjectGenerator::new("app", dir.path())
            .build_system(BuildSystem::None)
            .version_control(VersionControl::None)
            .generate()
            .wait()
            .unwrap();

        let err = ProjectGenerator::new("app", dir.path())
            .generate()
            .wait()
            .unwrap_err();
        assert!(matches!(err, Error::BadArgument(_)));
    }

    #[test]
    fn test_load_missing_manifest_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Project::load(dir.path()).unwrap_err(),
            Error::Filesystem(_)
        ));
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("cmake".parse::<BuildSystem>().unwrap(), BuildSystem::Cmake);
        assert_eq!("git".parse::<VersionControl>().unwrap(), VersionControl::Git);
        assert!("scons".parse::<BuildSystem>().is_err());
        assert!("svn".parse::<VersionControl>().is_err());
    }
}
