//! RBAC resolution: id-set validation and menu tree assembly.

use std::collections::HashMap;

use crate::error::{DomainError, DomainResult};
use crate::model::Menu;

/// Validates that every requested id exists in the store.
///
/// `existing` is the subset of `requested` that the store reported as present
/// (via an `existing_*_ids` lookup). An empty request is trivially valid. On a
/// size mismatch the error carries the specific missing ids, in the order they
/// appeared in the request.
pub fn validate_ids(
    entity: &'static str,
    requested: &[i64],
    existing: &[i64],
) -> DomainResult<()> {
    if requested.is_empty() {
        return Ok(());
    }
    if existing.len() == requested.len() {
        return Ok(());
    }
    let missing: Vec<i64> = requested
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect();
    Err(DomainError::MissingIds { entity, missing })
}

/// Assembles a flat list of granted menus into a parent-child tree.
///
/// A menu whose `parent_id` is null, or references a menu outside the granted
/// set, becomes a root (dangling parents are tolerated by policy). Roots and
/// every children list are sorted by `sort_order` ascending with `None`
/// sorting last; ties keep their original relative order.
pub fn build_menu_tree(flat: Vec<Menu>) -> Vec<Menu> {
    let ids: Vec<i64> = flat.iter().map(|m| m.id).collect();
    let granted: std::collections::HashSet<i64> = ids.iter().copied().collect();

    // Distribute children under their parents, preserving input order.
    let mut children_of: HashMap<i64, Vec<Menu>> = HashMap::new();
    let mut root_ids: Vec<i64> = Vec::new();
    let mut nodes: HashMap<i64, Menu> = HashMap::new();

    for mut menu in flat {
        menu.children = Vec::new();
        match menu.parent_id {
            Some(parent) if granted.contains(&parent) && parent != menu.id => {
                children_of.entry(parent).or_default().push(menu);
            }
            _ => {
                root_ids.push(menu.id);
                nodes.insert(menu.id, menu);
            }
        }
    }

    // Attach children depth-first, sorting each sibling group after its own
    // subtrees are complete. Grant lists are shallow in practice.
    fn attach(node: &mut Menu, children_of: &mut HashMap<i64, Vec<Menu>>) {
        if let Some(mut kids) = children_of.remove(&node.id) {
            for kid in &mut kids {
                attach(kid, children_of);
            }
            sort_by_order(&mut kids);
            node.children = kids;
        }
    }

    let mut roots: Vec<Menu> = root_ids
        .into_iter()
        .filter_map(|id| nodes.remove(&id))
        .collect();
    for root in &mut roots {
        attach(root, &mut children_of);
    }
    sort_by_order(&mut roots);

    // Entries still left in children_of at this point belong to a parent
    // cycle; they are dropped silently.
    roots
}

/// Stable sort by `sort_order` ascending, `None` after all `Some`.
fn sort_by_order(menus: &mut [Menu]) {
    menus.sort_by_key(|m| match m.sort_order {
        Some(v) => (0, v),
        None => (1, 0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_list_is_trivially_valid() {
        assert!(validate_ids("Role", &[], &[]).is_ok());
    }

    #[test]
    fn matching_sets_are_valid() {
        assert!(validate_ids("Role", &[1, 2, 3], &[1, 2, 3]).is_ok());
    }

    #[test]
    fn missing_ids_are_reported_in_request_order() {
        let err = validate_ids("Role", &[1, 99, 100], &[1]).unwrap_err();
        match err {
            DomainError::MissingIds { entity, missing } => {
                assert_eq!(entity, "Role");
                assert_eq!(missing, vec![99, 100]);
            }
            other => panic!("expected MissingIds, got {other:?}"),
        }
    }

    #[test]
    fn validation_is_idempotent() {
        let requested = [4, 5];
        let existing = [4, 5];
        assert!(validate_ids("Menu", &requested, &existing).is_ok());
        assert!(validate_ids("Menu", &requested, &existing).is_ok());
    }

    #[test]
    fn empty_grant_list_builds_empty_tree() {
        assert!(build_menu_tree(Vec::new()).is_empty());
    }

    #[test]
    fn single_root_keeps_empty_children() {
        let tree = build_menu_tree(vec![Menu::new(1, "home", "/home")]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn chain_nests_grandchildren() {
        let a = Menu::new(1, "a", "/a");
        let b = Menu::new(2, "b", "/b").with_parent(1);
        let c = Menu::new(3, "c", "/c").with_parent(2);
        let tree = build_menu_tree(vec![c, a, b]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, 2);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].id, 3);
        assert!(tree[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn orphaned_parent_reference_becomes_root() {
        // Parent 42 is not in the granted set.
        let orphan = Menu::new(5, "orphan", "/orphan").with_parent(42);
        let root = Menu::new(1, "root", "/");
        let tree = build_menu_tree(vec![orphan, root]);
        let ids: Vec<i64> = tree.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&5));
        assert!(ids.contains(&1));
    }

    #[test]
    fn roots_and_children_sorted_by_sort_order_nulls_last() {
        let r1 = Menu::new(1, "third", "/3"); // no sort order: last
        let r2 = Menu::new(2, "first", "/1").with_sort_order(10);
        let r3 = Menu::new(3, "second", "/2").with_sort_order(20);
        let c1 = Menu::new(4, "kid-late", "/k2").with_parent(2).with_sort_order(5);
        let c2 = Menu::new(5, "kid-early", "/k1").with_parent(2).with_sort_order(1);
        let tree = build_menu_tree(vec![r1, c1, r2, c2, r3]);
        let root_ids: Vec<i64> = tree.iter().map(|m| m.id).collect();
        assert_eq!(root_ids, vec![2, 3, 1]);
        let kid_ids: Vec<i64> = tree[0].children.iter().map(|m| m.id).collect();
        assert_eq!(kid_ids, vec![5, 4]);
    }

    #[test]
    fn tie_on_sort_order_preserves_input_order() {
        let a = Menu::new(1, "a", "/a").with_sort_order(1);
        let b = Menu::new(2, "b", "/b").with_sort_order(1);
        let c = Menu::new(3, "c", "/c").with_sort_order(1);
        let tree = build_menu_tree(vec![a, b, c]);
        let ids: Vec<i64> = tree.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn self_referencing_parent_is_treated_as_root() {
        let weird = Menu::new(9, "self", "/self").with_parent(9);
        let tree = build_menu_tree(vec![weird]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
