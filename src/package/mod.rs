// src/package/mod.rs

//! Package entity model
//!
//! A [`Package`] is the immutable unit of resolution: a name, a version,
//! declared dependencies, a free-form flag set, and the identity of the
//! source that produced it. Package metadata files inside a source mirror
//! (`packages/<name>/<version>.json`) decode into this model; unknown
//! fields are ignored.

use crate::error::{Error, Result};
use crate::version::{Version, VersionRequirement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Option-key to option-value mapping used to parameterize an installation
///
/// Keys are merged left-to-right; the rightmost value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageConfiguration(BTreeMap<String, String>);

impl PackageConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `KEY=VALUE` items, as collected from repeated `--config` flags
    pub fn from_items<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let mut map = BTreeMap::new();
        for item in items {
            let item = item.as_ref();
            let (key, value) = item.split_once('=').ok_or_else(|| {
                Error::BadArgument(format!("config '{item}' is not of the form KEY=VALUE"))
            })?;
            if key.is_empty() {
                return Err(Error::BadArgument(format!("config '{item}' has an empty key")));
            }
            map.insert(key.to_string(), value.to_string());
        }
        Ok(Self(map))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge `overlay` on top of `self`; overlay entries win
    pub fn merged(&self, overlay: &PackageConfiguration) -> PackageConfiguration {
        let mut map = self.0.clone();
        for (k, v) in &overlay.0 {
            map.insert(k.clone(), v.clone());
        }
        PackageConfiguration(map)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A declared dependency on another package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    pub name: String,

    /// Version requirement; absent means any version
    #[serde(rename = "version", default, skip_serializing_if = "VersionRequirement::is_any")]
    pub requirement: VersionRequirement,

    /// Configuration overlay applied when this dependency is installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PackageConfiguration>,
}

/// The identity of an installed or resolvable package
///
/// Two packages are the same iff name, version and source identity match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
    pub source: String,
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Package metadata, immutable once loaded from a source mirror
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Version,

    /// Declared dependencies, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PackageDependency>,

    /// Free-form capability/flag set
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,

    /// Name of the source this package was loaded from; not part of the
    /// metadata file, assigned by the indexer
    #[serde(skip)]
    pub source: String,
}

impl Package {
    /// Decode a metadata document and stamp it with its source identity
    pub fn from_metadata(json: &str, source: &str) -> Result<Self> {
        let mut package: Package = serde_json::from_str(json)
            .map_err(|e| Error::BadArgument(format!("invalid package metadata: {e}")))?;
        if package.name.is_empty() {
            return Err(Error::BadArgument(
                "package metadata has an empty name".to_string(),
            ));
        }
        package.source = source.to_string();
        Ok(package)
    }

    pub fn id(&self) -> PackageId {
        PackageId {
            name: self.name.clone(),
            version: self.version.clone(),
            source: self.source.clone(),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.source == other.source
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.source.hash(state);
    }
}
