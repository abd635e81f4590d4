//! Property-based tests for version comparison.
//!
//! These tests use proptest to generate random version strings and verify
//! that `rpmvercmp` behaves like a total order.

#[cfg(test)]
mod proptest_tests {
    use crate::version::rpmvercmp;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    // Version strings built from the characters that matter to the segment
    // splitter: digits, letters, separators, tilde and caret.
    fn version_string() -> impl Strategy<Value = String> {
        "[0-9a-z._~^]{0,12}"
    }

    proptest! {
        /// Property: every version compares equal to itself
        #[test]
        fn rpmvercmp_is_reflexive(a in version_string()) {
            prop_assert_eq!(rpmvercmp(&a, &a), Ordering::Equal);
        }

        /// Property: swapping the arguments reverses the result
        #[test]
        fn rpmvercmp_is_antisymmetric(a in version_string(), b in version_string()) {
            prop_assert_eq!(rpmvercmp(&a, &b), rpmvercmp(&b, &a).reverse());
        }

        /// Property: a < b and b < c implies a < c
        #[test]
        fn rpmvercmp_is_transitive(
            a in version_string(),
            b in version_string(),
            c in version_string(),
        ) {
            if rpmvercmp(&a, &b) == Ordering::Less && rpmvercmp(&b, &c) == Ordering::Less {
                prop_assert_eq!(rpmvercmp(&a, &c), Ordering::Less);
            }
        }

        /// Property: purely numeric versions compare like integers
        #[test]
        fn rpmvercmp_numeric_matches_integer_order(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            prop_assert_eq!(rpmvercmp(&a.to_string(), &b.to_string()), a.cmp(&b));
        }

        /// Property: appending a dotted numeric segment always produces a newer version
        #[test]
        fn rpmvercmp_extra_segment_is_newer(base in "[0-9]{1,3}(\\.[0-9]{1,3}){0,3}", extra in 0u32..100) {
            let longer = format!("{}.{}", base, extra);
            prop_assert_eq!(rpmvercmp(&longer, &base), Ordering::Greater);
        }

        /// Property: a tilde suffix always sorts before the bare version
        #[test]
        fn rpmvercmp_tilde_sorts_first(base in "[0-9]{1,3}(\\.[0-9]{1,3}){0,2}", tag in "[a-z]{1,4}[0-9]{0,2}") {
            let pre = format!("{}~{}", base, tag);
            prop_assert_eq!(rpmvercmp(&pre, &base), Ordering::Less);
        }
    }
}
