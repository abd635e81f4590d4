//! Phase 1: Bucketing
//!
//! This is the first phase of a scheduling run. It partitions every source
//! package known to the catalog into timestamp-keyed buckets, one per logical
//! update event.
//!
//! ## Process
//!
//! 1.  **Advisory scan**: Advisories are visited in ascending issue-date
//!     order. Each advisory's binaries are restricted to the supported
//!     channels and architectures, then resolved to their source packages.
//!     Sources already placed by an earlier advisory pin the whole advisory to
//!     that earlier bucket; otherwise the bucket key is the advisory's issue
//!     date in UTC epoch seconds. Advisories at or before `firstErrata` fold
//!     into the golden bucket.
//!
//! 2.  **Failure collection**: Unknown binaries and empty advisories are
//!     collected over the whole stream and raised once at the end, unless the
//!     advisory is allow-listed in `brokenErrata`.
//!
//! 3.  **Fallback classification**: Every source no advisory referenced is
//!     classified, in order, as
//!     - *golden* when it was built before the first advisory threshold, or
//!       when it is older than the version of the same name shipped by the
//!       earliest update;
//!     - *extra* when a bucketed sibling of the same name produces a strict
//!       superset of its binaries (a partial rebuild);
//!     - *orphan* otherwise, which is fatal unless allow-listed.
//!
//! Extras and allowed orphans go to `extraBuckets[nevra]` when configured,
//! otherwise to the first bucket at or after their build time, otherwise to
//! the last bucket. An extra never ships before the sibling it was rebuilt
//! from: nearest placement is held back to that sibling's bucket, and an
//! `extraBuckets` entry pointing earlier is an `Error::Assertion`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use super::{AdvisoryDetail, Partition, GOLDEN_BUCKET};
use crate::advisory::{Advisory, AdvisoryPackage};
use crate::catalog::PackageCatalog;
use crate::config::Config;
use crate::error::{BrokenAdvisory, Error, Result};
use crate::package::{Nevra, SourcePackage};
use crate::version::CompareVersions;

/// Whether an advisory membership survives channel and architecture
/// restriction. Empty sets restrict nothing.
pub fn is_supported(
    package: &AdvisoryPackage,
    channels: &BTreeSet<String>,
    arches: &BTreeSet<String>,
) -> bool {
    (channels.is_empty() || channels.contains(&package.channel))
        && (arches.is_empty() || arches.contains(&package.nevra.arch))
}

/// Execute Phase 1: build the advisory-driven partition.
///
/// `advisories` must already be in ascending issue-date order.
pub fn execute(
    catalog: &dyn PackageCatalog,
    advisories: &[Advisory],
    channels: &BTreeSet<String>,
    config: &Config,
    comparator: &dyn CompareVersions,
) -> Result<Partition> {
    let mut partition = Partition::new();
    let mut placed: BTreeMap<Nevra, i64> = BTreeMap::new();
    let mut broken: Vec<BrokenAdvisory> = Vec::new();
    let mut empty: Vec<String> = Vec::new();

    for advisory in advisories {
        let members: Vec<&AdvisoryPackage> = advisory
            .packages
            .iter()
            .filter(|p| is_supported(p, channels, &config.arches))
            .collect();

        if members.is_empty() {
            if config.is_broken_errata(&advisory.name) {
                warn!("Skipping broken advisory {} with no supported packages", advisory.name);
            } else {
                empty.push(advisory.name.clone());
            }
            continue;
        }

        let mut fresh: BTreeSet<Nevra> = BTreeSet::new();
        let mut targets: BTreeSet<i64> = BTreeSet::new();
        let mut missing: BTreeSet<String> = BTreeSet::new();

        for member in members {
            let Some(source) = catalog.source_of(&member.nevra) else {
                missing.insert(member.nevra.to_string());
                continue;
            };
            partition.link(&advisory.name, &source.nevra);
            match placed.get(&source.nevra) {
                Some(key) => {
                    targets.insert(*key);
                }
                None => {
                    fresh.insert(source.nevra.clone());
                }
            }
        }

        if !missing.is_empty() {
            if config.is_broken_errata(&advisory.name) {
                warn!(
                    "Excluding unknown packages of broken advisory {}: {}",
                    advisory.name,
                    missing.iter().cloned().collect::<Vec<_>>().join(", ")
                );
            } else {
                broken.push(BrokenAdvisory {
                    advisory: advisory.name.clone(),
                    missing: missing.into_iter().collect(),
                });
                continue;
            }
        }

        if fresh.is_empty() && targets.is_empty() {
            continue;
        }

        let derived = advisory.bucket_key();
        let issued = if config.first_errata.is_some_and(|first| derived <= first) {
            GOLDEN_BUCKET
        } else {
            derived
        };
        let key = match targets.first() {
            Some(earliest) => {
                if targets.len() > 1 {
                    warn!(
                        "Advisory {} spans buckets {:?}, using {}",
                        advisory.name, targets, earliest
                    );
                }
                *earliest
            }
            None => issued,
        };

        partition.record_issue(&advisory.name, issued);
        for source in fresh {
            partition.insert(key, source.clone());
            placed.insert(source, key);
        }
        partition.add_detail(
            key,
            AdvisoryDetail {
                name: advisory.name.clone(),
                summary: advisory.synopsis.clone(),
            },
        );
    }

    if !broken.is_empty() {
        return Err(Error::DataIntegrity { advisories: broken });
    }
    if !empty.is_empty() {
        return Err(Error::SourceDataMissing { advisories: empty });
    }

    info!(
        "Bucketed {} sources from {} advisories into {} buckets",
        placed.len(),
        advisories.len(),
        partition.len()
    );

    classify_unreferenced(partition, placed, catalog, config, comparator)
}

/// Golden threshold: `firstErrata`, otherwise the first advisory bucket.
fn threshold(partition: &Partition, config: &Config) -> i64 {
    config
        .first_errata
        .or_else(|| partition.keys().find(|key| *key != GOLDEN_BUCKET))
        .unwrap_or(i64::MAX)
}

/// Place every source no advisory referenced.
fn classify_unreferenced(
    mut partition: Partition,
    mut placed: BTreeMap<Nevra, i64>,
    catalog: &dyn PackageCatalog,
    config: &Config,
    comparator: &dyn CompareVersions,
) -> Result<Partition> {
    let threshold = threshold(&partition, config);
    let ignored: BTreeSet<&Nevra> = config.ignore_sources.iter().collect();

    let unreferenced: Vec<&SourcePackage> = catalog
        .sources()
        .into_iter()
        .filter(|s| !placed.contains_key(&s.nevra) && !ignored.contains(&s.nevra))
        .collect();

    let mut leftovers = Vec::new();
    for source in unreferenced {
        let built = catalog
            .earliest_build_time(&source.nevra)
            .unwrap_or(source.build_time);
        if built < threshold || is_superseded(&source.nevra, &placed, comparator) {
            debug!("Golden source {}", source.nevra);
            partition.insert(GOLDEN_BUCKET, source.nevra.clone());
            placed.insert(source.nevra.clone(), GOLDEN_BUCKET);
        } else {
            leftovers.push((source, built));
        }
    }

    let mut orphans = Vec::new();
    for (source, built) in leftovers {
        if let Some(sibling) = partial_rebuild_of(&source.nevra, &placed, catalog) {
            let key = match config.extra_buckets.get(&source.nevra) {
                Some(key) if *key < sibling => {
                    return Err(Error::Assertion {
                        message: format!(
                            "extra source {} is mapped to bucket {} before its full build in bucket {}",
                            source.nevra, key, sibling
                        ),
                    });
                }
                Some(key) => *key,
                None => nearest_bucket(&partition, built).max(sibling),
            };
            debug!("Extra source {} placed in bucket {}", source.nevra, key);
            partition.insert(key, source.nevra.clone());
        } else if config.allow_missing_errata.contains(&source.nevra) {
            let key = nearest_bucket(&partition, built);
            info!("Allowed source {} without errata placed in bucket {}", source.nevra, key);
            partition.insert(key, source.nevra.clone());
        } else {
            orphans.push(source.nevra.to_string());
        }
    }

    if !orphans.is_empty() {
        return Err(Error::MissingErrata { packages: orphans });
    }

    Ok(partition)
}

/// Whether a source is older than the version of its name shipped by the
/// earliest update bucket.
fn is_superseded(
    nevra: &Nevra,
    placed: &BTreeMap<Nevra, i64>,
    comparator: &dyn CompareVersions,
) -> bool {
    placed
        .iter()
        .filter(|(other, key)| other.name == nevra.name && **key != GOLDEN_BUCKET)
        .min_by_key(|(_, key)| **key)
        .is_some_and(|(first, _)| comparator.compare(nevra, first) == Ordering::Less)
}

/// Earliest bucket of a sibling of the same name whose binaries are a strict
/// superset of this source's, if this source is such a partial rebuild.
fn partial_rebuild_of(
    nevra: &Nevra,
    placed: &BTreeMap<Nevra, i64>,
    catalog: &dyn PackageCatalog,
) -> Option<i64> {
    let names = catalog.binary_names(nevra);
    catalog
        .sources_named(&nevra.name)
        .into_iter()
        .filter(|sibling| sibling.nevra != *nevra)
        .filter_map(|sibling| {
            let key = placed.get(&sibling.nevra)?;
            let sibling_names = catalog.binary_names(&sibling.nevra);
            (sibling_names.len() > names.len() && names.is_subset(&sibling_names)).then_some(*key)
        })
        .min()
}

/// First bucket at or after `built`, else the last bucket, else the golden
/// bucket.
fn nearest_bucket(partition: &Partition, built: i64) -> i64 {
    partition
        .keys()
        .find(|key| *key >= built)
        .or_else(|| partition.keys().last())
        .unwrap_or(GOLDEN_BUCKET)
}
