use super::*;

fn scene_with_children(count: usize) -> (MemoryScene, HostNode, Vec<HostNode>) {
    let mut scene = MemoryScene::new();
    let root = scene.create_node("root", None);
    let children = (0..count)
        .map(|i| {
            let child = scene.create_node(&format!("child{i}"), None);
            scene.set_parent(child, Some(root));
            child
        })
        .collect();
    (scene, root, children)
}

#[test]
fn set_parent_appends_and_moves() {
    let (mut scene, root, children) = scene_with_children(3);
    assert_eq!(scene.children(root), children.as_slice());
    assert_eq!(scene.sibling_index(children[2]), 2);

    let other = scene.create_node("other", None);
    scene.set_parent(children[0], Some(other));
    assert_eq!(scene.children(root), &[children[1], children[2]]);
    assert_eq!(scene.parent(children[0]), Some(other));

    scene.set_parent(children[1], None);
    assert_eq!(scene.parent(children[1]), None);
    assert_eq!(scene.child_count(root), 1);
}

#[test]
fn sibling_index_is_clamped() {
    let (mut scene, root, children) = scene_with_children(3);
    scene.set_sibling_index(children[0], 10);
    assert_eq!(scene.children(root), &[children[1], children[2], children[0]]);
    scene.set_sibling_index(children[0], 0);
    assert_eq!(scene.child(root, 0), Some(children[0]));
    assert_eq!(scene.child(root, 3), None);
}

#[test]
fn destroying_a_node_destroys_its_subtree() {
    let (mut scene, root, children) = scene_with_children(2);
    let grandchild = scene.create_node("grandchild", None);
    scene.set_parent(grandchild, Some(children[0]));
    assert_eq!(scene.len(), 4);

    scene.destroy_node(children[0]);
    assert!(!scene.contains(children[0]));
    assert!(!scene.contains(grandchild));
    assert_eq!(scene.children(root), &[children[1]]);
    assert_eq!(scene.len(), 2);
}

#[test]
fn dump_marks_inactive_nodes() {
    let (mut scene, root, children) = scene_with_children(2);
    scene.set_active(children[1], false);
    let dump = scene.dump_tree(Some(root));
    assert_eq!(dump, "[0] root\n  [1] child0\n  [2] child1 (inactive)\n");
    assert_eq!(scene.dump_tree(None), "(no root)\n");
}

#[test]
fn shared_scene_forwards_through_rc() {
    let shared = Rc::new(RefCell::new(MemoryScene::new()));
    let mut handle = Rc::clone(&shared);
    let node = handle.create_node("leaf", Some(HostNode(7)));
    assert_eq!(shared.borrow().name(node), Some("leaf"));
    assert_eq!(shared.borrow().template(node), Some(HostNode(7)));
}
