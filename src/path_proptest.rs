//! Property-based tests for forest paths, resolution, the dirstate and the
//! materialization plan.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::dirstate::{Dirstate, EntryKind, Facts};
    use crate::path::{ancestors, depth, join, normalize, parent, strip_prefix};
    use crate::phases::materialize::{plan, Action};
    use crate::test_support::registry_with;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn forest_path() -> impl Strategy<Value = String> {
        "[a-c]{1,2}(/[a-c]{1,2}){0,3}"
    }

    // ============================================================================
    // path property tests
    // ============================================================================

    proptest! {
        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(input in "[a-b./]{0,12}") {
            if let Ok(once) = normalize(&input) {
                let twice = normalize(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        /// Property: normalized paths have no empty or `.` components
        #[test]
        fn normalize_output_is_clean(input in "[a-b./]{0,12}") {
            if let Ok(result) = normalize(&input) {
                if !result.is_empty() {
                    for part in result.split('/') {
                        prop_assert!(!part.is_empty() && part != ".");
                    }
                }
            }
        }

        /// Property: strip_prefix undoes join
        #[test]
        fn strip_prefix_inverts_join(prefix in forest_path(), rel in forest_path()) {
            let joined = join(&prefix, &rel);
            prop_assert_eq!(strip_prefix(&joined, &prefix), Some(rel.as_str()));
            prop_assert_eq!(strip_prefix(&joined, ""), Some(joined.as_str()));
        }

        /// Property: ancestors walk one level at a time down to the root
        #[test]
        fn ancestors_end_at_root(path in forest_path()) {
            let chain: Vec<&str> = ancestors(&path).collect();
            prop_assert_eq!(chain.len(), depth(&path));
            prop_assert_eq!(chain.last().copied(), Some(""));
            prop_assert_eq!(chain[0], parent(&path));
        }
    }

    // ============================================================================
    // resolution property tests
    // ============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: every path resolves, and prefix + repo_path rebuilds it
        #[test]
        fn resolution_is_total(path in forest_path()) {
            let (_temp, registry) = registry_with(&["a", "a/b", "b/c"]);
            let resolution = registry.resolve(&path);
            prop_assert_eq!(join(resolution.prefix, resolution.repo_path), path.clone());
            prop_assert_eq!(resolution.backend.prefix(), resolution.prefix);
        }

        /// Property: the owning prefix is the longest registered ancestor
        #[test]
        fn resolution_prefers_longest_prefix(path in forest_path()) {
            let prefixes = ["a", "a/b", "b/c"];
            let (_temp, registry) = registry_with(&prefixes);
            let resolution = registry.resolve(&path);
            let longest = prefixes
                .iter()
                .filter(|p| strip_prefix(&path, p).is_some())
                .max_by_key(|p| p.len())
                .copied()
                .unwrap_or("");
            prop_assert_eq!(resolution.prefix, longest);
        }
    }

    // ============================================================================
    // dirstate property tests
    // ============================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: ancestors of a changed path are changed directories
        #[test]
        fn changes_propagate_to_ancestors(paths in prop::collection::vec(forest_path(), 1..8)) {
            let (_temp, registry) = registry_with(&["a", "b/c"]);
            let mut dirstate = Dirstate::new(&registry);
            for path in &paths {
                dirstate.store_item(path, Facts::changed());
            }
            for path in &paths {
                prop_assert!(dirstate.is_changed(path));
                for ancestor in ancestors(path) {
                    let item = dirstate.get(ancestor).unwrap();
                    prop_assert!(item.changed);
                    prop_assert_eq!(item.kind, Some(EntryKind::Directory));
                }
            }
        }

        /// Property: storing the same facts twice changes nothing
        #[test]
        fn store_item_is_idempotent(paths in prop::collection::vec(forest_path(), 1..8)) {
            let (_temp, registry) = registry_with(&["a"]);
            let mut dirstate = Dirstate::new(&registry);
            for path in &paths {
                dirstate.store_item(path, Facts::changed());
            }
            let mut before: Vec<_> = dirstate.iter().cloned().collect();
            for path in &paths {
                dirstate.store_item(path, Facts::changed());
            }
            let mut after: Vec<_> = dirstate.iter().cloned().collect();
            before.sort_by(|a, b| a.path.cmp(&b.path));
            after.sort_by(|a, b| a.path.cmp(&b.path));
            prop_assert_eq!(before, after);
        }

        /// Property: a later kind overrides, changed never reverts
        #[test]
        fn changed_is_sticky(path in forest_path()) {
            let (_temp, registry) = registry_with(&[]);
            let mut dirstate = Dirstate::new(&registry);
            dirstate.store_item(&path, Facts::changed());
            dirstate.store_item(&path, Facts::kind(EntryKind::File));
            let item = dirstate.get(&path).unwrap();
            prop_assert!(item.changed);
            prop_assert_eq!(item.kind, Some(EntryKind::File));
        }
    }

    // ============================================================================
    // materialization property tests
    // ============================================================================

    /// File paths whose leaf names never collide with directory names.
    fn file_path() -> impl Strategy<Value = String> {
        "([a-c]/){0,3}f[0-2]"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: every listed path is covered exactly once by the plan,
        /// either by its own action or by one linked ancestor
        #[test]
        fn plan_covers_every_listed_path_once(
            files in prop::collection::btree_set(file_path(), 1..12),
            flags in prop::collection::vec(any::<bool>(), 12),
        ) {
            let (_temp, registry) = registry_with(&["a", "b/c"]);
            let mut dirstate = Dirstate::new(&registry);

            let mut listed = BTreeSet::new();
            for file in &files {
                listed.insert(file.clone());
                listed.extend(ancestors(file).filter(|a| !a.is_empty()).map(str::to_string));
            }
            for (file, changed) in files.iter().zip(&flags) {
                if *changed {
                    dirstate.store_item(file, Facts::changed());
                }
            }
            for path in &listed {
                let kind = if files.contains(path) {
                    EntryKind::File
                } else {
                    EntryKind::Directory
                };
                dirstate.store_item(path, Facts::kind(kind));
            }

            let actions = plan(&dirstate);

            let links: Vec<&str> = actions
                .iter()
                .filter(|a| matches!(a, Action::LinkDir { .. } | Action::LinkFile { .. }))
                .map(Action::path)
                .collect();
            for action in &actions {
                prop_assert!(listed.contains(action.path()));
                for link in &links {
                    prop_assert!(
                        strip_prefix(action.path(), link).map_or(true, str::is_empty),
                        "{} is planned below link {}",
                        action.path(),
                        link
                    );
                }
            }
            for path in &listed {
                let covering = actions
                    .iter()
                    .filter(|a| {
                        a.path() == path.as_str()
                            || (matches!(a, Action::LinkDir { .. })
                                && ancestors(path).any(|anc| anc == a.path()))
                    })
                    .count();
                prop_assert_eq!(covering, 1, "{} is covered {} times", path, covering);
            }
            for (file, changed) in files.iter().zip(&flags) {
                if *changed {
                    let own = actions.iter().any(|a| {
                        matches!(a, Action::MaterializeFile { path, .. } if path == file)
                    });
                    prop_assert!(own, "changed {} is not materialized", file);
                }
            }
        }
    }
}
