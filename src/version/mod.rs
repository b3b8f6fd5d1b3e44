// src/version/mod.rs

//! Version handling and constraint satisfaction for package resolution
//!
//! Ralph versions are dotted numeric sequences with an optional trailing
//! prerelease tag, e.g. `1.2.3` or `1.2.3-alpha`. Requirements are
//! conjunctions of constraint clauses parsed from strings like
//! `>=1.0,<2.0` or `^1.4`.

use crate::error::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed package version
///
/// Ordering is total: components compare numerically with absent components
/// treated as zero, and a version without a prerelease tag sorts after the
/// same components with a tag (`1.2.3-alpha < 1.2.3`).
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    prerelease: Option<String>,
}

impl Version {
    /// Build a version from explicit parts
    pub fn new(components: Vec<u64>, prerelease: Option<String>) -> Self {
        Self {
            components,
            prerelease,
        }
    }

    /// Parse a version string
    ///
    /// Rejects the empty string, non-numeric components outside the tag,
    /// and more than one `-` separator.
    pub fn parse(s: &str) -> Result<Self> {
        let bad = |reason: &str| Error::BadVersion {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(bad("empty version"));
        }
        if s.matches('-').count() > 1 {
            return Err(bad("more than one '-' separator"));
        }

        let (numeric, prerelease) = match s.split_once('-') {
            Some((_, "")) => return Err(bad("empty prerelease tag")),
            Some((n, tag)) => (n, Some(tag.to_string())),
            None => (s, None),
        };

        let mut components = Vec::new();
        for part in numeric.split('.') {
            if part.is_empty() {
                return Err(bad("empty component"));
            }
            let value = part
                .parse::<u64>()
                .map_err(|_| bad(&format!("non-numeric component '{part}'")))?;
            components.push(value);
        }

        Ok(Self {
            components,
            prerelease,
        })
    }

    /// Numeric components, most significant first
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Prerelease tag, if any
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    /// Component at `index`, zero when absent
    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// Compare numeric components only, ignoring prerelease tags
    fn compare_components(&self, other: &Version) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.components {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        if let Some(ref tag) = self.prerelease {
            write!(f, "-{tag}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.compare_components(other) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zero components are not significant (1.2 == 1.2.0)
        let mut significant = self.components.as_slice();
        while let Some((&0, rest)) = significant.split_last() {
            significant = rest;
        }
        significant.hash(state);
        self.prerelease.hash(state);
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(D::Error::custom)
    }
}

/// A single constraint clause within a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Exact(Version),
    Greater(Version),
    GreaterOrEqual(Version),
    Less(Version),
    LessOrEqual(Version),
    /// `~x.y`: at least `x.y`, below `x.(y+1)`
    Tilde(Version),
    /// `^x.y.z`: at least `x.y.z`, below the next breaking version
    Caret(Version),
}

impl Clause {
    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Clause::Exact(v) => version == v,
            Clause::Greater(v) => version > v,
            Clause::GreaterOrEqual(v) => version >= v,
            Clause::Less(v) => version < v,
            Clause::LessOrEqual(v) => version <= v,
            Clause::Tilde(v) => version >= v && version < &tilde_upper(v),
            Clause::Caret(v) => version >= v && version < &caret_upper(v),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Exact(v) => write!(f, "={v}"),
            Clause::Greater(v) => write!(f, ">{v}"),
            Clause::GreaterOrEqual(v) => write!(f, ">={v}"),
            Clause::Less(v) => write!(f, "<{v}"),
            Clause::LessOrEqual(v) => write!(f, "<={v}"),
            Clause::Tilde(v) => write!(f, "~{v}"),
            Clause::Caret(v) => write!(f, "^{v}"),
        }
    }
}

/// Exclusive upper bound for `~base`
///
/// `~1.2.3` and `~1.2` both allow up to (not including) `1.3`; a bare `~1`
/// allows up to `2`.
fn tilde_upper(base: &Version) -> Version {
    let bump_at = if base.components().len() >= 2 { 1 } else { 0 };
    let mut components: Vec<u64> = base.components()[..=bump_at].to_vec();
    components[bump_at] += 1;
    Version::new(components, None)
}

/// Exclusive upper bound for `^base`
///
/// `^1.2.3` allows below `2.0.0`; `^0.2.3` allows below `0.3.0`.
fn caret_upper(base: &Version) -> Version {
    let major = base.components().first().copied().unwrap_or(0);
    if major > 0 {
        Version::new(vec![major + 1, 0, 0], None)
    } else {
        let minor = base.components().get(1).copied().unwrap_or(0);
        Version::new(vec![0, minor + 1, 0], None)
    }
}

/// A conjunction of version constraint clauses
///
/// The empty requirement matches any version. `satisfies` is total and
/// pure: it is the AND of all clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionRequirement {
    clauses: Vec<Clause>,
}

impl VersionRequirement {
    /// The requirement that matches every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether this requirement matches every version
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Parse a comma-separated list of constraint clauses
    ///
    /// Each clause is `<op><version>` with
    /// `op ∈ {=, ==, >=, >, <=, <, ~, ^}`; a bare version means exact.
    /// The empty string parses to the match-anything requirement.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::any());
        }

        let reject = |reason: String| Error::BadRequirement {
            input: s.to_string(),
            reason,
        };
        let version = |raw: &str| Version::parse(raw.trim()).map_err(|e| reject(e.to_string()));

        let mut clauses = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(reject("empty clause".to_string()));
            }

            let clause = if let Some(rest) = part.strip_prefix(">=") {
                Clause::GreaterOrEqual(version(rest)?)
            } else if let Some(rest) = part.strip_prefix("<=") {
                Clause::LessOrEqual(version(rest)?)
            } else if let Some(rest) = part.strip_prefix("==") {
                Clause::Exact(version(rest)?)
            } else if let Some(rest) = part.strip_prefix('=') {
                Clause::Exact(version(rest)?)
            } else if let Some(rest) = part.strip_prefix('>') {
                Clause::Greater(version(rest)?)
            } else if let Some(rest) = part.strip_prefix('<') {
                Clause::Less(version(rest)?)
            } else if let Some(rest) = part.strip_prefix('~') {
                Clause::Tilde(version(rest)?)
            } else if let Some(rest) = part.strip_prefix('^') {
                Clause::Caret(version(rest)?)
            } else {
                Clause::Exact(version(part)?)
            };
            clauses.push(clause);
        }

        Ok(Self { clauses })
    }

    /// Check whether `version` satisfies every clause
    pub fn satisfies(&self, version: &Version) -> bool {
        self.clauses.iter().all(|c| c.satisfies(version))
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "*");
        }
        let mut first = true;
        for clause in &self.clauses {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{clause}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for VersionRequirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionRequirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_any() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_str(&self.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for VersionRequirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "*" {
            return Ok(Self::any());
        }
        VersionRequirement::parse(&s).map_err(D::Error::custom)
    }
}
