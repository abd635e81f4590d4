//! # Corrective Suggestions
//!
//! Helpers that turn a problem into something the operator can act on.
//! Replay findings are only useful if they say how to fix the plan, so each
//! builder here renders a single-line override directive that is itself a
//! valid configuration document and can be pasted straight into the config.
//!
//! ## Usage
//!
//! ```
//! use errata_scheduler::suggestions;
//!
//! let line = suggestions::keep_obsolete("a-bin", "b-bin");
//! assert_eq!(line, "keepObsolete: [[a-bin, b-bin]]");
//! assert!(errata_scheduler::config::parse(&line).is_ok());
//! ```

use std::collections::BTreeSet;

use crate::config::KNOWN_KEYS;
use crate::package::Nevra;

/// Drop (`dest == None`) or move a source package out of a bucket.
pub fn reorder_source(nevra: &Nevra, source: i64, dest: Option<i64>) -> String {
    let dest = dest.map_or_else(|| "null".to_string(), |d| d.to_string());
    format!(
        "reorderSources: [{{nevra: \"{}\", source: {}, dest: {}}}]",
        nevra, source, dest
    )
}

/// Permit a specific downgrade in a bucket.
pub fn allow_downgrade(bucket: i64, from: &Nevra, to: &Nevra) -> String {
    format!(
        "allowDowngrades: [{{bucket: {}, from: \"{}\", to: \"{}\"}}]",
        bucket, from, to
    )
}

/// Let an obsoleting binary coexist with the binary it obsoletes.
pub fn keep_obsolete(obsoleting: &str, obsoleted: &str) -> String {
    format!("keepObsolete: [[{}, {}]]", obsoleting, obsoleted)
}

/// Let an obsoleting source coexist with the source it obsoletes.
pub fn keep_obsolete_source(obsoleting: &str, obsoleted: &str) -> String {
    format!("keepObsoleteSource: [[{}, {}]]", obsoleting, obsoleted)
}

/// Drop an obsoleted source at a bucket.
pub fn remove_obsoleted(bucket: i64, source_name: &str) -> String {
    format!("removeObsoleted: {{{}: [{}]}}", bucket, source_name)
}

/// Declare binary names removed at a bucket.
pub fn update_removes(bucket: i64, names: &BTreeSet<String>) -> String {
    format!("updateRemovesPackages: {{{}: [{}]}}", bucket, join(names))
}

/// Declare binary names replaced at a bucket.
pub fn update_replaces(bucket: i64, names: &BTreeSet<String>) -> String {
    format!("updateReplacesPackages: {{{}: [{}]}}", bucket, join(names))
}

/// "Did you mean" hint for a misspelled configuration key.
pub fn similar_directive(key: &str) -> Option<String> {
    find_similar(key, KNOWN_KEYS).map(|s| format!("Did you mean '{s}'?"))
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance, single-row variant.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::package::nevra;

    #[test]
    fn test_every_suggestion_is_a_valid_config() {
        let names: BTreeSet<String> = ["old-tool".to_string(), "old-lib".to_string()].into();
        let lines = [
            reorder_source(&nevra("pkg-1:0.9-1.src"), 200, None),
            reorder_source(&nevra("pkg-0.9-1.src"), 200, Some(300)),
            allow_downgrade(200, &nevra("pkg-1.0-1.src"), &nevra("pkg-1:0.9-1.src")),
            keep_obsolete("a-bin", "b-bin"),
            keep_obsolete_source("newpkg", "oldpkg"),
            remove_obsoleted(200, "oldpkg"),
            update_removes(200, &names),
            update_replaces(200, &names),
        ];
        for line in lines {
            assert!(parse(&line).is_ok(), "not a valid directive: {line}");
        }
    }

    #[test]
    fn test_reorder_source_drop_parses_as_null_dest() {
        let config = parse(&reorder_source(&nevra("pkg-0.9-1.src"), 200, None)).unwrap();
        assert_eq!(config.reorder_sources[0].dest, None);
        assert_eq!(config.reorder_sources[0].source, 200);
    }

    #[test]
    fn test_update_removes_lists_sorted_names() {
        let names: BTreeSet<String> = ["zz".to_string(), "aa".to_string()].into();
        assert_eq!(update_removes(7, &names), "updateRemovesPackages: {7: [aa, zz]}");
    }

    #[test]
    fn test_similar_directive() {
        assert_eq!(
            similar_directive("keepObsolet").as_deref(),
            Some("Did you mean 'keepObsolete'?")
        );
        assert_eq!(similar_directive("frobnicate"), None);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("mergeBuckets", "mergeBuckets"), 0);
        assert_eq!(edit_distance("mergeBucket", "mergeBuckets"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn test_find_similar() {
        let candidates = ["lastErrata", "firstErrata", "arches"];

        assert_eq!(find_similar("lastErata", &candidates), Some("lastErrata"));
        assert_eq!(find_similar("arch", &candidates), Some("arches"));
        assert_eq!(find_similar("foobar", &candidates), None);
    }
}
