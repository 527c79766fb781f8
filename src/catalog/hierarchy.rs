//! Tree and subtree resolution over a flat parent-pointer category set.
//!
//! Everything here is pure: callers fetch the full category set once and pass it in.
//! Traversals use an explicit stack or queue plus a visited set, so deep or cyclic
//! parent chains neither overflow the stack nor loop.

use crate::types::{Category, CategoryId, CategoryNode, Gender};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet, VecDeque};

/// parentId → children, each list in input order.
fn children_by_parent(categories: &[Category]) -> HashMap<&str, Vec<usize>> {
    let mut map: HashMap<&str, Vec<usize>> = HashMap::with_capacity(categories.len());
    for (idx, category) in categories.iter().enumerate() {
        if let Some(parent) = category.parent_id.as_deref() {
            map.entry(parent).or_default().push(idx);
        }
    }
    map
}

/// Materialize the forest rooted at every category with no parent.
///
/// With `gender` set, only roots tagged with that gender or untagged are kept; their
/// descendants are included regardless of tag. Siblings keep input order. Categories
/// unreachable from a kept root (orphans, members of parent cycles) are left out.
pub fn build_tree(categories: &[Category], gender: Option<Gender>) -> Vec<CategoryNode> {
    let children = children_by_parent(categories);

    let roots: Vec<usize> = categories
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_root())
        .filter(|(_, c)| match gender {
            Some(g) => c.gender.is_none() || c.gender == Some(g),
            None => true,
        })
        .map(|(idx, _)| idx)
        .collect();

    // Pre-order walk recording which parent adopted each visited node.
    let mut visited: HashSet<&str> = HashSet::with_capacity(categories.len());
    let mut order: Vec<usize> = Vec::with_capacity(categories.len());
    let mut adopted: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut kept_roots: Vec<usize> = Vec::with_capacity(roots.len());
    let mut stack: Vec<(usize, Option<usize>)> = roots.iter().rev().map(|&r| (r, None)).collect();

    while let Some((idx, parent)) = stack.pop() {
        let id = categories[idx].id.as_str();
        if !visited.insert(id) {
            continue;
        }
        order.push(idx);
        match parent {
            Some(p) => adopted.entry(p).or_default().push(idx),
            None => kept_roots.push(idx),
        }
        if let Some(kids) = children.get(id) {
            stack.extend(kids.iter().rev().map(|&k| (k, Some(idx))));
        }
    }

    // Children always follow their parent in pre-order, so building in reverse
    // finishes every child before its parent needs it.
    let mut built: HashMap<usize, CategoryNode> = HashMap::with_capacity(order.len());
    for &idx in order.iter().rev() {
        let kids = adopted
            .remove(&idx)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|k| built.remove(&k))
            .collect();
        built.insert(
            idx,
            CategoryNode {
                category: categories[idx].clone(),
                children: kids,
            },
        );
    }

    kept_roots
        .into_iter()
        .filter_map(|r| built.remove(&r))
        .collect()
}

/// Ids of `root_id` and all its descendants, breadth-first from the root.
///
/// An unknown `root_id` yields just `{root_id}`.
pub fn collect_descendant_ids(categories: &[Category], root_id: &str) -> IndexSet<CategoryId> {
    let children = children_by_parent(categories);
    let mut ids: IndexSet<CategoryId> = IndexSet::new();
    ids.insert(root_id.to_string());

    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(root_id);
    while let Some(id) = queue.pop_front() {
        let Some(kids) = children.get(id) else {
            continue;
        };
        for &k in kids {
            let child = categories[k].id.as_str();
            if ids.insert(child.to_string()) {
                queue.push_back(child);
            }
        }
    }
    ids
}

/// A category whose stored level disagrees with its position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelViolation {
    pub id: CategoryId,
    pub level: u32,
    /// `None` when the parent is missing from the set.
    pub expected: Option<u32>,
}

pub fn level_violations(categories: &[Category]) -> Vec<LevelViolation> {
    let mut by_id: HashMap<&str, &Category> = HashMap::with_capacity(categories.len());
    for c in categories {
        by_id.entry(c.id.as_str()).or_insert(c);
    }

    categories
        .iter()
        .filter_map(|c| {
            let expected = match c.parent_id.as_deref() {
                None => Some(0),
                Some(parent) => by_id.get(parent).map(|p| p.level + 1),
            };
            (expected != Some(c.level)).then(|| LevelViolation {
                id: c.id.clone(),
                level: c.level,
                expected,
            })
        })
        .collect()
}
