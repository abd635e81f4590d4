//! # Package Identities
//!
//! Source and binary packages are identified by their *nevra*: name, epoch,
//! version, release and architecture. Source packages always carry the
//! `src` architecture.
//!
//! `Nevra` derives a structural ordering so that every map keyed by package
//! identity iterates deterministically. That ordering says nothing about which
//! package is *newer*; version ordering always goes through
//! [`crate::version::CompareVersions`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Architecture string carried by every source package.
pub const SOURCE_ARCH: &str = "src";

/// Name, epoch, version, release and architecture of a package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nevra {
    pub name: String,
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl Nevra {
    pub fn new(name: &str, epoch: u32, version: &str, release: &str, arch: &str) -> Self {
        Self {
            name: name.to_string(),
            epoch,
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        }
    }

    /// Whether this identity names a source package.
    pub fn is_source(&self) -> bool {
        self.arch == SOURCE_ARCH
    }

    /// The `[epoch:]version-release` part of the identity.
    pub fn evr(&self) -> String {
        if self.epoch == 0 {
            format!("{}-{}", self.version, self.release)
        } else {
            format!("{}:{}-{}", self.epoch, self.version, self.release)
        }
    }

    /// Same name, epoch, version and release with a different architecture.
    pub fn with_arch(&self, arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Nevra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.evr(), self.arch)
    }
}

impl FromStr for Nevra {
    type Err = Error;

    /// Parses `name-[epoch:]version-release.arch`.
    ///
    /// The name may itself contain dashes; version and release may not.
    fn from_str(value: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidNevra {
            value: value.to_string(),
            message: message.to_string(),
        };

        let (rest, arch) = value
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing architecture"))?;
        let (rest, release) = rest
            .rsplit_once('-')
            .ok_or_else(|| invalid("missing release"))?;
        let (name, epoch_version) = rest
            .rsplit_once('-')
            .ok_or_else(|| invalid("missing version"))?;

        let (epoch, version) = match epoch_version.split_once(':') {
            Some((epoch, version)) => {
                let epoch = epoch
                    .parse::<u32>()
                    .map_err(|_| invalid("epoch is not a number"))?;
                (epoch, version)
            }
            None => (0, epoch_version),
        };

        if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
            return Err(invalid("empty component"));
        }

        Ok(Nevra::new(name, epoch, version, release, arch))
    }
}

impl Serialize for Nevra {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Nevra {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A buildable source package as known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePackage {
    pub nevra: Nevra,
    /// Build time in epoch seconds.
    #[serde(rename = "buildTime")]
    pub build_time: i64,
}

/// An installable artifact produced by exactly one source package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPackage {
    pub nevra: Nevra,
    /// The source package this binary was built from.
    pub source: Nevra,
    /// Path of the artifact inside the mirrored repository.
    pub location: String,
    /// Names of binaries this one supersedes.
    #[serde(default)]
    pub obsoletes: BTreeSet<String>,
    #[serde(rename = "buildTime")]
    pub build_time: i64,
}

/// Parses a nevra, panicking on malformed input. Test helper.
#[cfg(test)]
pub(crate) fn nevra(value: &str) -> Nevra {
    value.parse().unwrap()
}
