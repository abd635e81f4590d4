//! # Package Catalog
//!
//! The catalog is the snapshot of every source and binary package known to
//! the mirrored repository. It is an external collaborator: the scheduler
//! only consumes it through the [`PackageCatalog`] trait.
//!
//! [`MemoryCatalog`] is the in-memory implementation used by the CLI and the
//! tests. It derives the lookup indexes once at construction:
//!
//! - binary → source
//! - source → binaries
//! - name → sources
//! - binary → obsoleted names
//! - repository location → binary

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::package::{BinaryPackage, Nevra, SourcePackage};

/// Read-only view of the package catalog.
pub trait PackageCatalog {
    /// Every source package, in identity order.
    fn sources(&self) -> Vec<&SourcePackage>;

    /// Look up a source package by identity.
    fn source(&self, nevra: &Nevra) -> Option<&SourcePackage>;

    /// Look up a binary package by identity.
    fn binary(&self, nevra: &Nevra) -> Option<&BinaryPackage>;

    /// Binaries produced by a source package, in identity order.
    fn binaries_of(&self, source: &Nevra) -> Vec<&BinaryPackage>;

    /// Every source package sharing a name, in identity order.
    fn sources_named(&self, name: &str) -> Vec<&SourcePackage>;

    /// The binary stored at a repository path.
    fn binary_at(&self, location: &str) -> Option<&BinaryPackage>;

    /// The source a binary was built from.
    fn source_of(&self, binary: &Nevra) -> Option<&SourcePackage> {
        self.binary(binary).and_then(|b| self.source(&b.source))
    }

    /// Names of every binary a source produces.
    fn binary_names(&self, source: &Nevra) -> BTreeSet<String> {
        self.binaries_of(source)
            .into_iter()
            .map(|b| b.nevra.name.clone())
            .collect()
    }

    /// Earliest build time among a source's binaries, falling back to the
    /// source's own build time when it produces none.
    fn earliest_build_time(&self, source: &Nevra) -> Option<i64> {
        self.binaries_of(source)
            .into_iter()
            .map(|b| b.build_time)
            .min()
            .or_else(|| self.source(source).map(|s| s.build_time))
    }
}

/// A binary as written in a snapshot file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryRecord {
    pub nevra: Nevra,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub obsoletes: BTreeSet<String>,
    /// Defaults to the source build time.
    #[serde(default, rename = "buildTime")]
    pub build_time: Option<i64>,
}

/// A source package and its binaries as written in a snapshot file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceRecord {
    pub nevra: Nevra,
    #[serde(rename = "buildTime")]
    pub build_time: i64,
    #[serde(default)]
    pub binaries: Vec<BinaryRecord>,
}

/// In-memory catalog with precomputed indexes.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    sources: BTreeMap<Nevra, SourcePackage>,
    binaries: BTreeMap<Nevra, BinaryPackage>,
    src_pkg_map: BTreeMap<Nevra, BTreeSet<Nevra>>,
    src_name_map: BTreeMap<String, BTreeSet<Nevra>>,
    location_map: BTreeMap<String, Nevra>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from snapshot records.
    pub fn from_records(records: Vec<SourceRecord>) -> Result<Self> {
        let mut catalog = Self::new();
        for record in records {
            catalog.add_source(record)?;
        }
        Ok(catalog)
    }

    /// Add a source package with its binaries.
    ///
    /// Fails if the source identity is not a `src` package or if any identity
    /// or repository location is already taken.
    pub fn add_source(&mut self, record: SourceRecord) -> Result<()> {
        if !record.nevra.is_source() {
            return Err(Error::Catalog {
                message: format!("{} is not a source package", record.nevra),
            });
        }
        if self.sources.contains_key(&record.nevra) {
            return Err(Error::Catalog {
                message: format!("duplicate source package {}", record.nevra),
            });
        }

        let mut binaries = Vec::with_capacity(record.binaries.len());
        for binary in record.binaries {
            if binary.nevra.is_source() {
                return Err(Error::Catalog {
                    message: format!("binary {} uses the source architecture", binary.nevra),
                });
            }
            if self.binaries.contains_key(&binary.nevra) {
                return Err(Error::Catalog {
                    message: format!("duplicate binary package {}", binary.nevra),
                });
            }
            let location = binary
                .location
                .unwrap_or_else(|| format!("{}.rpm", binary.nevra));
            if self.location_map.contains_key(&location) {
                return Err(Error::Catalog {
                    message: format!("duplicate repository location {}", location),
                });
            }
            binaries.push(BinaryPackage {
                nevra: binary.nevra,
                source: record.nevra.clone(),
                location,
                obsoletes: binary.obsoletes,
                build_time: binary.build_time.unwrap_or(record.build_time),
            });
        }

        let source = record.nevra;
        let members = self.src_pkg_map.entry(source.clone()).or_default();
        for binary in binaries {
            members.insert(binary.nevra.clone());
            self.location_map
                .insert(binary.location.clone(), binary.nevra.clone());
            self.binaries.insert(binary.nevra.clone(), binary);
        }
        self.src_name_map
            .entry(source.name.clone())
            .or_default()
            .insert(source.clone());
        self.sources.insert(
            source.clone(),
            SourcePackage {
                nevra: source,
                build_time: record.build_time,
            },
        );
        Ok(())
    }

    /// Number of source packages
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Binary → obsoleted names index.
    pub fn obsoletes_map(&self) -> BTreeMap<&Nevra, &BTreeSet<String>> {
        self.binaries
            .iter()
            .filter(|(_, b)| !b.obsoletes.is_empty())
            .map(|(nevra, b)| (nevra, &b.obsoletes))
            .collect()
    }
}

impl PackageCatalog for MemoryCatalog {
    fn sources(&self) -> Vec<&SourcePackage> {
        self.sources.values().collect()
    }

    fn source(&self, nevra: &Nevra) -> Option<&SourcePackage> {
        self.sources.get(nevra)
    }

    fn binary(&self, nevra: &Nevra) -> Option<&BinaryPackage> {
        self.binaries.get(nevra)
    }

    fn binaries_of(&self, source: &Nevra) -> Vec<&BinaryPackage> {
        self.src_pkg_map
            .get(source)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|nevra| self.binaries.get(nevra))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn sources_named(&self, name: &str) -> Vec<&SourcePackage> {
        self.src_name_map
            .get(name)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|nevra| self.sources.get(nevra))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn binary_at(&self, location: &str) -> Option<&BinaryPackage> {
        self.location_map
            .get(location)
            .and_then(|nevra| self.binaries.get(nevra))
    }
}

/// Snapshot record for a source whose binaries share its version and are
/// built for `x86_64`.
#[cfg(test)]
pub(crate) fn source_record(source: &str, build_time: i64, binaries: &[&str]) -> SourceRecord {
    let nevra: Nevra = crate::package::nevra(source);
    SourceRecord {
        binaries: binaries
            .iter()
            .map(|name| BinaryRecord {
                nevra: Nevra {
                    name: name.to_string(),
                    ..nevra.with_arch("x86_64")
                },
                location: None,
                obsoletes: BTreeSet::new(),
                build_time: None,
            })
            .collect(),
        nevra,
        build_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::nevra;

    fn record(src: &str, build_time: i64, binaries: &[(&str, &[&str])]) -> SourceRecord {
        SourceRecord {
            nevra: nevra(src),
            build_time,
            binaries: binaries
                .iter()
                .map(|(bin, obsoletes)| BinaryRecord {
                    nevra: nevra(bin),
                    location: None,
                    obsoletes: obsoletes.iter().map(|s| s.to_string()).collect(),
                    build_time: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_indexes_are_derived() {
        let catalog = MemoryCatalog::from_records(vec![
            record(
                "foo-1.0-1.src",
                100,
                &[("foo-1.0-1.x86_64", &[]), ("foo-devel-1.0-1.x86_64", &["foo-headers"])],
            ),
            record("foo-1.1-1.src", 200, &[("foo-1.1-1.x86_64", &[])]),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.source_of(&nevra("foo-devel-1.0-1.x86_64")).unwrap().nevra,
            nevra("foo-1.0-1.src")
        );
        assert_eq!(catalog.binaries_of(&nevra("foo-1.0-1.src")).len(), 2);
        assert_eq!(catalog.sources_named("foo").len(), 2);
        assert!(catalog.sources_named("bar").is_empty());
        assert_eq!(
            catalog.binary_names(&nevra("foo-1.0-1.src")),
            ["foo", "foo-devel"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            catalog
                .binary_at("foo-1.1-1.x86_64.rpm")
                .map(|b| b.nevra.clone()),
            Some(nevra("foo-1.1-1.x86_64"))
        );
        assert_eq!(catalog.obsoletes_map().len(), 1);
    }

    #[test]
    fn test_earliest_build_time_prefers_binaries() {
        let mut source = record("foo-1.0-1.src", 500, &[("foo-1.0-1.x86_64", &[])]);
        source.binaries[0].build_time = Some(300);
        let catalog = MemoryCatalog::from_records(vec![
            source,
            record("bare-1-1.src", 42, &[]),
        ])
        .unwrap();

        assert_eq!(catalog.earliest_build_time(&nevra("foo-1.0-1.src")), Some(300));
        assert_eq!(catalog.earliest_build_time(&nevra("bare-1-1.src")), Some(42));
        assert_eq!(catalog.earliest_build_time(&nevra("gone-1-1.src")), None);
    }

    #[test]
    fn test_rejects_duplicates_and_bad_arches() {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_source(record("foo-1.0-1.src", 1, &[("foo-1.0-1.x86_64", &[])]))
            .unwrap();

        let dup_source = catalog.add_source(record("foo-1.0-1.src", 1, &[]));
        assert!(matches!(dup_source, Err(Error::Catalog { .. })));

        let dup_binary = catalog.add_source(record("foo-1.0-2.src", 1, &[("foo-1.0-1.x86_64", &[])]));
        assert!(matches!(dup_binary, Err(Error::Catalog { .. })));

        let not_source = catalog.add_source(record("foo-1.0-3.x86_64", 1, &[]));
        assert!(matches!(not_source, Err(Error::Catalog { .. })));
    }
}
