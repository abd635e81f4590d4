//! Phase 2: Overrides
//!
//! Applies the operator's manual corrections on top of the bucketing result.
//! The steps always run in this order:
//!
//! 1.  Drop ignored sources
//! 2.  Trim buckets after `lastErrata`
//! 3.  Merge bucket groups into their first key
//! 4.  Move whole buckets to new keys
//! 5.  Move one advisory's packages between buckets
//! 6.  Move or drop single sources
//! 7.  Force sources into buckets
//! 8.  Trim buckets later than now
//!
//! Each step takes the partition by value and returns the rewritten one, so
//! any step can be run on its own. No step checks version monotonicity or
//! obsolescence; that is left to the replay.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use super::Partition;
use crate::catalog::PackageCatalog;
use crate::config::{AddSource, Config, ReorderAdvisory, ReorderBucket, ReorderSource};
use crate::error::{Error, Result};
use crate::package::Nevra;

/// Execute Phase 2: apply every override directive in order.
///
/// `now` is the wall-clock moment in epoch seconds; later buckets are
/// dropped.
pub fn execute(
    partition: Partition,
    catalog: &dyn PackageCatalog,
    config: &Config,
    now: i64,
) -> Result<Partition> {
    let partition = ignore_sources(partition, &config.ignore_sources);
    let partition = trim_after(partition, config.last_errata);
    let partition = merge_buckets(partition, &config.merge_buckets)?;
    let partition = reorder_buckets(partition, &config.reorder_buckets)?;
    let partition = reorder_advisories(partition, &config.reorder_advisories)?;
    let partition = reorder_sources(partition, &config.reorder_sources)?;
    let partition = add_sources(partition, catalog, &config.add_sources)?;
    Ok(trim_future(partition, now))
}

/// Remove ignored sources from their buckets and from advisory membership.
pub fn ignore_sources(mut partition: Partition, ignored: &[Nevra]) -> Partition {
    for nevra in ignored {
        match partition.bucket_of(nevra) {
            Some(key) => {
                partition.remove(key, nevra);
                partition.unlink_package(nevra);
                info!("Ignored {} from bucket {}", nevra, key);
            }
            None => debug!("Ignored source {} is not scheduled", nevra),
        }
    }
    partition
}

/// Drop every bucket later than `last`.
pub fn trim_after(mut partition: Partition, last: Option<i64>) -> Partition {
    let Some(last) = last else {
        return partition;
    };
    let dropped = partition.retain_keys(|key| key <= last);
    if !dropped.is_empty() {
        info!("Dropped {} buckets after last errata {}", dropped.len(), last);
    }
    partition
}

/// Fold each group of buckets into its first key.
///
/// Members already folded away are skipped, so applying a group twice is the
/// same as applying it once.
pub fn merge_buckets(mut partition: Partition, groups: &[Vec<i64>]) -> Result<Partition> {
    for group in groups {
        let Some((&head, rest)) = group.split_first() else {
            continue;
        };
        if !group.iter().any(|key| partition.contains_key(*key)) {
            return Err(Error::target_not_found(
                "mergeBuckets",
                format!("none of buckets {:?} exist", group),
            ));
        }

        for &key in rest.iter().filter(|key| **key != head) {
            let Some(contents) = partition.take_bucket(key) else {
                debug!("Merge skipped missing bucket {}", key);
                continue;
            };
            warn_on_overlap(&partition, head, key, &contents.packages);
            partition.put_bucket(head, contents);
            info!("Merged bucket {} into {}", key, head);
        }
    }
    Ok(partition)
}

fn warn_on_overlap(partition: &Partition, head: i64, key: i64, incoming: &BTreeSet<Nevra>) {
    let existing: BTreeMap<&str, &Nevra> = partition
        .bucket(head)
        .into_iter()
        .flatten()
        .map(|n| (n.name.as_str(), n))
        .collect();
    for nevra in incoming {
        if let Some(other) = existing.get(nevra.name.as_str()) {
            if *other != nevra {
                warn!(
                    "Merging bucket {} into {} puts {} next to {}",
                    key, head, nevra, other
                );
            }
        }
    }
}

/// Move whole buckets to previously unused keys.
pub fn reorder_buckets(mut partition: Partition, moves: &[ReorderBucket]) -> Result<Partition> {
    for reorder in moves {
        if partition.contains_key(reorder.dest) {
            return Err(Error::DirectiveConflict {
                directive: "reorderBuckets".to_string(),
                message: format!("destination bucket {} already exists", reorder.dest),
            });
        }
        let contents = partition.take_bucket(reorder.source).ok_or_else(|| {
            Error::target_not_found(
                "reorderBuckets",
                format!("bucket {} does not exist", reorder.source),
            )
        })?;
        partition.put_bucket(reorder.dest, contents);
        info!("Moved bucket {} to {}", reorder.source, reorder.dest);
    }
    Ok(partition)
}

/// Move the packages of single advisories between buckets.
///
/// A package shared with other advisories may only move if every one of
/// them is moved to the same destination.
pub fn reorder_advisories(
    mut partition: Partition,
    moves: &[ReorderAdvisory],
) -> Result<Partition> {
    // packages placed by an earlier directive of this list, with their bucket
    let mut moved: BTreeMap<Nevra, i64> = BTreeMap::new();
    for reorder in moves {
        let packages = partition
            .advisory_packages(&reorder.advisory)
            .cloned()
            .unwrap_or_default();
        if packages.is_empty() {
            return Err(Error::target_not_found(
                "reorderAdvisories",
                format!("advisory {} has no scheduled packages", reorder.advisory),
            ));
        }

        let mut moving = Vec::new();
        for nevra in &packages {
            let co_advisories: BTreeSet<String> = partition
                .advisories_for(nevra)
                .into_iter()
                .flatten()
                .filter(|name| **name != reorder.advisory)
                .cloned()
                .collect();

            let in_source = partition
                .bucket(reorder.source)
                .is_some_and(|b| b.contains(nevra));
            let already_moved = !co_advisories.is_empty()
                && moved.get(nevra) == Some(&reorder.dest)
                && partition
                    .bucket(reorder.dest)
                    .is_some_and(|b| b.contains(nevra));
            if already_moved {
                continue;
            }
            if !in_source {
                return Err(Error::target_not_found(
                    "reorderAdvisories",
                    format!(
                        "advisory package {} of {} missing from bucket {}",
                        nevra, reorder.advisory, reorder.source
                    ),
                ));
            }

            for co in &co_advisories {
                let follows = moves
                    .iter()
                    .any(|other| other.advisory == *co && other.dest == reorder.dest);
                if !follows {
                    return Err(Error::Assertion {
                        message: format!(
                            "{} is shared by {} and {}, which is not moved to bucket {}",
                            nevra, reorder.advisory, co, reorder.dest
                        ),
                    });
                }
                if moves
                    .iter()
                    .any(|other| other.advisory == *co && other.source == reorder.source)
                {
                    partition.move_detail(co, reorder.source, reorder.dest);
                }
            }
            moving.push(nevra.clone());
        }

        partition.move_detail(&reorder.advisory, reorder.source, reorder.dest);
        for nevra in moving {
            partition.remove(reorder.source, &nevra);
            partition.insert(reorder.dest, nevra.clone());
            moved.insert(nevra, reorder.dest);
        }
        info!(
            "Moved advisory {} from bucket {} to {}",
            reorder.advisory, reorder.source, reorder.dest
        );
    }
    Ok(partition)
}

/// Move single sources between buckets, or drop them when the destination
/// is null.
pub fn reorder_sources(mut partition: Partition, moves: &[ReorderSource]) -> Result<Partition> {
    for reorder in moves {
        let present = partition
            .bucket(reorder.source)
            .is_some_and(|b| b.contains(&reorder.nevra));
        if !present {
            return Err(Error::target_not_found(
                "reorderSources",
                format!(
                    "package {} not found in bucket {}",
                    reorder.nevra, reorder.source
                ),
            ));
        }

        match reorder.dest {
            Some(dest) => {
                partition.move_package(&reorder.nevra, reorder.source, dest);
                info!("Moved {} from bucket {} to {}", reorder.nevra, reorder.source, dest);
            }
            None => {
                partition.remove(reorder.source, &reorder.nevra);
                partition.unlink_package(&reorder.nevra);
                info!("Dropped {} from bucket {}", reorder.nevra, reorder.source);
            }
        }
    }
    Ok(partition)
}

/// Force known sources into buckets ahead of their natural placement.
pub fn add_sources(
    mut partition: Partition,
    catalog: &dyn PackageCatalog,
    additions: &[AddSource],
) -> Result<Partition> {
    for add in additions {
        if catalog.source(&add.nevra).is_none() {
            return Err(Error::target_not_found(
                "addSources",
                format!("{} is not a known source package", add.nevra),
            ));
        }
        match partition.bucket_of(&add.nevra) {
            Some(previous) => {
                partition.move_package(&add.nevra, previous, add.bucket);
                debug!("Pulled {} out of bucket {}", add.nevra, previous);
            }
            None => partition.insert(add.bucket, add.nevra.clone()),
        }
        partition.mark_forced(add.bucket, &add.nevra);
        info!("Forced {} into bucket {}", add.nevra, add.bucket);
    }
    Ok(partition)
}

/// Drop every bucket scheduled after `now`.
pub fn trim_future(mut partition: Partition, now: i64) -> Partition {
    let dropped = partition.retain_keys(|key| key <= now);
    if !dropped.is_empty() {
        info!("Dropped {} future buckets", dropped.len());
    }
    partition
}
