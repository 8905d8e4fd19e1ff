use super::*;

#[test]
fn insert_updates_subtree_len_up_the_chain() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let a = g.init();
    let b = g.init();

    g.insert(root, a);
    assert_eq!(g.len(root), 2);

    g.insert(a, b);
    assert_eq!(g.len(a), 2);
    assert_eq!(g.len(root), 3);
}

#[test]
fn insert_detaches_existing_parent_first() {
    let mut g = NodeGraph::new();
    let root_a = g.init();
    let root_b = g.init();
    let child = g.init();

    g.insert(root_a, child);
    assert_eq!(g.len(root_a), 2);

    g.insert(root_b, child);
    assert_eq!(g.len(root_a), 1, "child must be removed from its old parent");
    assert_eq!(g.len(root_b), 2);
    assert_eq!(g.parent(child), Some(root_b));
}

#[test]
fn drop_node_restores_parent_subtree_len() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let child = g.init();
    let grandchild = g.init();

    g.insert(root, child);
    g.insert(child, grandchild);
    assert_eq!(g.len(root), 3);

    g.drop_node(child);
    assert_eq!(g.len(root), 1);
    assert_eq!(g.len(child), 2, "child keeps its own subtree on detach");
    assert!(g.is_root(child));
}

#[test]
fn prune_detaches_all_children_in_one_pass() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let a = g.init();
    let b = g.init();

    g.insert(root, a);
    g.insert(root, b);
    assert_eq!(g.len(root), 3);

    g.prune(root);
    assert_eq!(g.len(root), 1);
    assert!(g.is_root(a));
    assert!(g.is_root(b));
    assert!(g.children(root).is_empty());
}

#[test]
fn traverse_visits_breadth_first_and_skips_root() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let a = g.init();
    let b = g.init();
    let c = g.init();

    g.insert(root, a);
    g.insert(root, b);
    g.insert(a, c);

    let mut order = Vec::new();
    g.traverse(root, |_, n| {
        order.push(n);
        Ok(false)
    })
    .unwrap();

    assert_eq!(order.len(), 3);
    assert!(!order.contains(&root));
    // c (grandchild) must come after both a and b (its ancestors' siblings).
    let c_pos = order.iter().position(|&n| n == c).unwrap();
    assert!(c_pos >= 2);
}

#[test]
fn traverse_can_stop_early() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let a = g.init();
    let b = g.init();
    g.insert(root, a);
    g.insert(root, b);

    let mut visited = 0;
    g.traverse(root, |_, _| {
        visited += 1;
        Ok(true)
    })
    .unwrap();

    assert_eq!(visited, 1);
}

#[test]
fn world_transform_composes_with_parent() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let child = g.init();
    g.insert(root, child);

    g.set_local_xform(
        root,
        Transform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            ..Default::default()
        },
    );
    g.set_local_xform(
        child,
        Transform {
            translation: Vec3::new(0.0, 2.0, 0.0),
            ..Default::default()
        },
    );

    g.traverse(root, |_, _| Ok(false)).unwrap();

    // root's own world transform is never updated by traverse (it is not a
    // descendant of itself), so the child only sees root's default identity.
    let world = g.world_xform(child);
    let pos = world.transform_point3(Vec3::ZERO);
    assert_eq!(pos, Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn deinit_removes_whole_subtree() {
    let mut g = NodeGraph::new();
    let root = g.init();
    let child = g.init();
    let grandchild = g.init();
    g.insert(root, child);
    g.insert(child, grandchild);

    g.deinit(child);
    assert_eq!(g.len(root), 1);
    assert!(g.children(root).is_empty());
}
