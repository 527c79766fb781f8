//! Property tests for tree materialization and subtree expansion.

use aisle::catalog::{build_tree, collect_descendant_ids};
use aisle::{Category, CategoryNode, Gender};
use proptest::prelude::*;

// =============================================================================
// Strategy helpers
// =============================================================================

fn gender_strategy() -> impl Strategy<Value = Option<Gender>> {
    prop_oneof![Just(None), Just(Some(Gender::Men)), Just(Some(Gender::Women))]
}

/// An acyclic category set: each category's parent, if any, appears earlier.
fn forest_strategy(max: usize) -> impl Strategy<Value = Vec<Category>> {
    prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), gender_strategy()), 0..max)
        .prop_map(|entries| {
            let mut out: Vec<Category> = Vec::with_capacity(entries.len());
            for (i, (pick, is_root, gender)) in entries.into_iter().enumerate() {
                let parent = if i == 0 || is_root {
                    None
                } else {
                    Some(&out[pick.index(i)])
                };
                let (parent_id, level) = match parent {
                    Some(p) => (Some(p.id.clone()), p.level + 1),
                    None => (None, 0),
                };
                out.push(Category {
                    id: format!("c{}", i),
                    name: format!("Category {}", i),
                    description: String::new(),
                    parent_id,
                    level,
                    gender,
                });
            }
            out
        })
}

/// Arbitrary parent pointers, including self-loops, cycles and dangling parents.
fn tangled_strategy(max: usize) -> impl Strategy<Value = Vec<Category>> {
    prop::collection::vec(prop::option::of(0..max + 2), 1..max).prop_map(|parents| {
        parents
            .into_iter()
            .enumerate()
            .map(|(i, parent)| Category {
                id: format!("c{}", i),
                name: format!("Category {}", i),
                description: String::new(),
                parent_id: parent.map(|p| format!("c{}", p)),
                level: 0,
                gender: None,
            })
            .collect()
    })
}

fn count(nodes: &[CategoryNode]) -> usize {
    nodes.iter().map(|n| 1 + count(&n.children)).sum()
}

fn index_of(id: &str) -> usize {
    id[1..].parse().unwrap()
}

fn siblings_in_input_order(nodes: &[CategoryNode]) -> bool {
    nodes
        .windows(2)
        .all(|w| index_of(&w[0].category.id) < index_of(&w[1].category.id))
        && nodes.iter().all(|n| siblings_in_input_order(&n.children))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn subtree_contains_root_and_every_child_subtree(cats in forest_strategy(40)) {
        for c in &cats {
            let ids = collect_descendant_ids(&cats, &c.id);
            prop_assert!(ids.contains(&c.id));
            for child in cats.iter().filter(|x| x.parent_id.as_deref() == Some(c.id.as_str())) {
                let child_ids = collect_descendant_ids(&cats, &child.id);
                prop_assert!(child_ids.is_subset(&ids));
            }
        }
    }

    #[test]
    fn tree_holds_every_category_exactly_once(cats in forest_strategy(40)) {
        let forest = build_tree(&cats, None);
        prop_assert_eq!(count(&forest), cats.len());
        prop_assert!(siblings_in_input_order(&forest));
    }

    #[test]
    fn gender_filter_only_drops_whole_root_subtrees(
        cats in forest_strategy(40),
        gender in prop_oneof![Just(Gender::Men), Just(Gender::Women)],
    ) {
        let forest = build_tree(&cats, Some(gender));
        for root in &forest {
            prop_assert!(root.category.gender.is_none() || root.category.gender == Some(gender));
            let expected = collect_descendant_ids(&cats, &root.category.id).len();
            prop_assert_eq!(count(std::slice::from_ref(root)), expected);
        }
    }

    #[test]
    fn tangled_parents_terminate(cats in tangled_strategy(30)) {
        let forest = build_tree(&cats, None);
        prop_assert!(count(&forest) <= cats.len());
        for c in &cats {
            let ids = collect_descendant_ids(&cats, &c.id);
            prop_assert!(ids.len() <= cats.len());
        }
    }
}
