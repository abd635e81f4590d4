//! # Version Comparison
//!
//! Both the bucket builder and the replay validator need to decide whether
//! one package build is newer than another. This module isolates that
//! decision behind the [`CompareVersions`] trait so the rest of the pipeline
//! never looks at version strings directly.
//!
//! ## RPM Semantics
//!
//! [`RpmVersionComparator`] orders `(epoch, version, release)` triples the
//! way RPM does:
//!
//! 1.  **Epoch** is compared numerically first; a higher epoch always wins.
//! 2.  **Version** and then **release** are compared with [`rpmvercmp`], which
//!     splits each string into alternating numeric and alphabetic segments:
//!     - separators (anything not alphanumeric, `~` or `^`) are skipped;
//!     - `~` sorts before everything, including the end of the string
//!       (`1.0~rc1 < 1.0`);
//!     - `^` sorts after the end of the string but before any other segment
//!       (`1.0 < 1.0^git1 < 1.0.1`);
//!     - numeric segments compare by value, ignoring leading zeros, and are
//!       always newer than alphabetic segments;
//!     - alphabetic segments compare bytewise.
//!
//! The architecture never takes part in the comparison.

use std::cmp::Ordering;

use crate::package::Nevra;

/// Total order over package builds sharing a name.
pub trait CompareVersions {
    /// Compares the `(epoch, version, release)` of two packages.
    fn compare(&self, a: &Nevra, b: &Nevra) -> Ordering;

    /// Whether `candidate` is strictly newer than `current`.
    fn is_newer(&self, candidate: &Nevra, current: &Nevra) -> bool {
        self.compare(candidate, current) == Ordering::Greater
    }
}

/// The RPM comparator used by default throughout the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpmVersionComparator;

impl CompareVersions for RpmVersionComparator {
    fn compare(&self, a: &Nevra, b: &Nevra) -> Ordering {
        compare_evr(a, b)
    }
}

/// Compare epoch, then version, then release.
pub fn compare_evr(a: &Nevra, b: &Nevra) -> Ordering {
    a.epoch
        .cmp(&b.epoch)
        .then_with(|| rpmvercmp(&a.version, &b.version))
        .then_with(|| rpmvercmp(&a.release, &b.release))
}

/// Compare two version (or release) strings with RPM segment semantics.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() || j < two.len() {
        while i < one.len() && is_separator(one[i]) {
            i += 1;
        }
        while j < two.len() && is_separator(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1 == Some(b'^') || c2 == Some(b'^') {
            if c1.is_none() {
                return Ordering::Less;
            }
            if c2.is_none() {
                return Ordering::Greater;
            }
            if c1 != Some(b'^') {
                return Ordering::Greater;
            }
            if c2 != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        let (Some(first), Some(_)) = (c1, c2) else {
            break;
        };

        let numeric = first.is_ascii_digit();
        let take = |bytes: &[u8], start: usize| -> usize {
            let mut end = start;
            while end < bytes.len()
                && if numeric {
                    bytes[end].is_ascii_digit()
                } else {
                    bytes[end].is_ascii_alphabetic()
                }
            {
                end += 1;
            }
            end
        };

        let end1 = take(one, i);
        let end2 = take(two, j);
        let mut seg1 = &one[i..end1];
        let mut seg2 = &two[j..end2];
        i = end1;
        j = end2;

        // Segment types differ: numeric always beats alphabetic.
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        if numeric {
            seg1 = strip_leading_zeros(seg1);
            seg2 = strip_leading_zeros(seg2);
            match seg1.len().cmp(&seg2.len()) {
                Ordering::Equal => {}
                longer => return longer,
            }
        }

        match seg1.cmp(seg2) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    let rest1 = i < one.len();
    let rest2 = j < two.len();
    match (rest1, rest2) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn is_separator(byte: u8) -> bool {
    !byte.is_ascii_alphanumeric() && byte != b'~' && byte != b'^'
}

fn strip_leading_zeros(segment: &[u8]) -> &[u8] {
    let zeros = segment.iter().take_while(|b| **b == b'0').count();
    &segment[zeros..]
}
