use crate::{
    Builder, ContextKey, StatefulWidget, Template, Widget, WidgetChild, WidgetId, WidgetTree,
};

#[derive(Clone, Default)]
struct Item;

impl Widget for Item {}

#[derive(Clone, Default)]
struct Fading {
    fade_frames: u32,
    elapsed: u32,
}

impl Widget for Fading {
    fn try_to_release(&mut self) -> bool {
        self.elapsed += 1;
        self.elapsed > self.fade_frames
    }

    fn reset_state(&mut self) {
        self.elapsed = 0;
    }
}

/// Declares one child per key, each under its own unique key.
#[derive(Clone, Default)]
struct Keyed {
    keys: Vec<i64>,
    template: Option<WidgetId>,
}

impl Widget for Keyed {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        for key in &self.keys {
            match self.template {
                Some(template) => {
                    builder.declare(Template::<Fading>::root(template), ContextKey::id(*key));
                }
                None => {
                    builder.widget::<Item>(ContextKey::id(*key));
                }
            }
        }
    }

    fn reset_state(&mut self) {
        self.keys.clear();
    }
}

impl StatefulWidget for Keyed {
    type State = Vec<i64>;

    fn state(&self) -> &Vec<i64> {
        &self.keys
    }

    fn state_mut(&mut self) -> &mut Vec<i64> {
        &mut self.keys
    }
}

#[derive(Clone, Default)]
struct UniquePair {
    first: Option<WidgetChild<Item>>,
    second: Option<WidgetChild<Item>>,
}

impl Widget for UniquePair {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.first = builder.widget::<Item>(ContextKey::id(7));
        self.second = builder.widget::<Item>(ContextKey::id(7));
    }
}

#[derive(Clone, Default)]
struct Positional {
    count: usize,
}

impl Widget for Positional {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        for _ in 0..self.count {
            builder.widget::<Item>(ContextKey::none());
        }
    }
}

fn instances(tree: &WidgetTree, id: WidgetId) -> Vec<WidgetId> {
    tree.children(id).iter().map(|child| child.instance).collect()
}

fn keyed_root(tree: &mut WidgetTree, keys: Vec<i64>) -> WidgetId {
    let root = tree.spawn_root(Keyed {
        keys,
        template: None,
    });
    tree.tick();
    root
}

#[test]
fn same_declarations_keep_instances_and_order() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2, 3]);
    let first = instances(&tree, root);
    assert_eq!(first.len(), 3);
    assert!(tree.order_changed(root));

    assert!(tree.mark_dirty(root, false));
    tree.tick();

    assert_eq!(instances(&tree, root), first);
    assert!(!tree.order_changed(root));
    assert_eq!(tree.total_pooled(), 0);
}

#[test]
fn reordered_keys_reuse_every_instance() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2, 3]);
    let [a, b, c]: [WidgetId; 3] = instances(&tree, root).try_into().unwrap();

    assert_eq!(tree.set_state::<Keyed>(root, vec![2, 1, 3], false), Ok(true));
    tree.tick();

    assert_eq!(instances(&tree, root), vec![b, a, c]);
    assert!(tree.order_changed(root));
    assert_eq!(tree.widget_index(b), Some(0));
    assert_eq!(tree.widget_index(a), Some(1));
    assert_eq!(tree.widget_index(c), Some(2));
}

#[test]
fn host_children_follow_sibling_order() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2, 3]);
    tree.set_state::<Keyed>(root, vec![3, 1, 2], false).unwrap();
    tree.tick();

    let root_host = tree.host(root).unwrap();
    let expected: Vec<_> = instances(&tree, root)
        .into_iter()
        .map(|id| tree.host(id).unwrap())
        .collect();
    let scene = tree.scene();
    let actual: Vec<_> = (0..scene.child_count(root_host))
        .filter_map(|index| scene.child(root_host, index))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn dropped_declaration_is_released() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2]);
    let [a, b]: [WidgetId; 2] = instances(&tree, root).try_into().unwrap();

    tree.set_state::<Keyed>(root, vec![1], false).unwrap();
    tree.tick();

    assert_eq!(instances(&tree, root), vec![a]);
    assert!(tree.is_released(b));
    assert!(tree.is_pooled(b));
    assert!(tree.is_spawned(a));
}

#[test]
fn inserted_key_lands_between_existing_children() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 3]);
    let [a, c]: [WidgetId; 2] = instances(&tree, root).try_into().unwrap();

    tree.set_state::<Keyed>(root, vec![1, 2, 3], false).unwrap();
    tree.tick();

    let now = instances(&tree, root);
    assert_eq!(now.len(), 3);
    assert_eq!(now[0], a);
    assert_eq!(now[2], c);
    assert!(tree.is_spawned(now[1]));
}

#[test]
fn unique_key_refuses_second_child() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(UniquePair::default());
    tree.tick();

    let (first, second) = tree
        .with_widget::<UniquePair, _>(root, |pair| (pair.first, pair.second))
        .unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(tree.children(root).len(), 1);

    tree.mark_dirty(root, false);
    tree.tick();
    let again = tree
        .with_widget::<UniquePair, _>(root, |pair| pair.first)
        .unwrap();
    assert_eq!(again, first);
}

#[test]
fn shared_key_matches_children_by_position() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(Positional { count: 3 });
    tree.tick();
    let before = instances(&tree, root);
    assert_eq!(before.len(), 3);

    tree.with_widget_mut::<Positional, _>(root, |w| w.count = 2)
        .unwrap();
    tree.mark_dirty(root, false);
    tree.tick();

    let after = instances(&tree, root);
    assert_eq!(after, before[..2].to_vec());
    assert!(tree.is_released(before[2]));
}

#[test]
fn releasing_child_keeps_its_slot_until_done() {
    let mut tree = WidgetTree::new();
    let template = tree.create_archetype(Fading {
        fade_frames: 2,
        elapsed: 0,
    });
    let root = tree.spawn_root(Keyed {
        keys: vec![1, 2, 3],
        template: Some(template),
    });
    tree.tick();
    let [a, b, c]: [WidgetId; 3] = instances(&tree, root).try_into().unwrap();

    tree.set_state::<Keyed>(root, vec![1, 3], false).unwrap();
    tree.tick();
    assert!(tree.is_releasing(b));
    assert_eq!(instances(&tree, root), vec![a, b, c]);
    assert_eq!(tree.pending_releases(), 1);

    let mut ticks = 0;
    while tree.is_spawned(b) && ticks < 10 {
        tree.tick();
        ticks += 1;
    }
    assert!(tree.is_released(b));
    assert!(tree.is_pooled(b));
    assert_eq!(instances(&tree, root), vec![a, c]);
    assert_eq!(tree.pending_releases(), 0);
}

#[test]
fn owner_refresh_does_not_hurry_a_releasing_child() {
    let mut tree = WidgetTree::new();
    let template = tree.create_archetype(Fading {
        fade_frames: 2,
        elapsed: 0,
    });
    let root = tree.spawn_root(Keyed {
        keys: vec![1, 2],
        template: Some(template),
    });
    tree.tick();
    let [_, b]: [WidgetId; 2] = instances(&tree, root).try_into().unwrap();

    tree.set_state::<Keyed>(root, vec![1], false).unwrap();
    tree.tick();
    assert_eq!(tree.with_widget::<Fading, _>(b, |f| f.elapsed).unwrap(), 1);

    tree.mark_dirty(root, false);
    tree.tick();
    assert!(tree.has_refreshed(root));
    assert!(tree.is_releasing(b));
    assert_eq!(tree.with_widget::<Fading, _>(b, |f| f.elapsed).unwrap(), 2);

    tree.tick();
    assert!(tree.is_released(b));
}

#[test]
fn declaring_into_missing_parent_is_a_no_op() {
    let mut tree = WidgetTree::new();
    let mut builder = tree.builder(42, 42);
    assert!(!builder.is_open());
    assert!(builder.widget::<Item>(ContextKey::none()).is_none());
}

#[test]
fn second_begin_closes_the_unfinished_session() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2]);
    let [a, b]: [WidgetId; 2] = instances(&tree, root).try_into().unwrap();

    {
        let mut stale = tree.builder(root, root);
        assert!(stale.widget::<Item>(ContextKey::id(1)).is_some());
        std::mem::forget(stale);
    }

    let builder = tree.builder(root, root);
    assert!(builder.is_open());
    builder.end();

    assert!(tree.is_released(b));
    assert!(tree.is_released(a));
    assert!(tree.children(root).is_empty());
}

#[test]
fn owner_must_be_an_ancestor() {
    let mut tree = WidgetTree::new();
    let left = tree.spawn_root(Item);
    let right = tree.spawn_root(Item);
    tree.tick();

    let builder = tree.builder(left, right);
    assert!(!builder.is_open());
}

#[test]
fn child_released_behind_the_owners_back_is_forgotten() {
    let mut tree = WidgetTree::new();
    let root = keyed_root(&mut tree, vec![1, 2]);
    let [a, b]: [WidgetId; 2] = instances(&tree, root).try_into().unwrap();

    tree.release(b);
    assert!(tree.is_pooled(b));

    tree.set_state::<Keyed>(root, vec![1, 2, 3], false).unwrap();
    tree.tick();

    let now = instances(&tree, root);
    assert_eq!(now.len(), 3);
    assert_eq!(now[0], a);
    assert!(now.iter().all(|id| tree.is_spawned(*id)));
    let mut distinct = now.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 3);
}
