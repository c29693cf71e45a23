use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{
    Builder, ContextKey, FrameScheduler, TreeConfig, Widget, WidgetChild, WidgetError, WidgetId,
    WidgetTree,
};

#[derive(Default)]
struct CountingScheduler {
    requests: AtomicUsize,
}

impl FrameScheduler for CountingScheduler {
    fn schedule_frame(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct Leaf {
    refreshes: u32,
}

impl Widget for Leaf {
    fn refresh(&mut self, _builder: &mut Builder<'_>) {
        self.refreshes += 1;
    }
}

/// Declares a leaf and re-dirties it on every refresh.
#[derive(Clone, Default)]
struct Middle {
    leaf: Option<WidgetChild<Leaf>>,
}

impl Widget for Middle {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.leaf = builder.widget::<Leaf>(ContextKey::none());
        if let Some(leaf) = self.leaf {
            builder.tree_mut().mark_dirty(leaf.widget, false);
        }
    }
}

#[derive(Clone, Default)]
struct Outer {
    refreshes: u32,
    middle: Option<WidgetChild<Middle>>,
}

impl Widget for Outer {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.refreshes += 1;
        self.middle = builder.widget::<Middle>(ContextKey::none());
    }
}

/// Marks its owner dirty once, forced or not.
#[derive(Clone, Default)]
struct Poke<const FORCE: bool> {
    poked: bool,
}

impl<const FORCE: bool> Widget for Poke<FORCE> {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        if self.poked {
            return;
        }
        self.poked = true;
        let owner = builder.tree().owner(builder.parent());
        if let Some(owner) = owner {
            builder.tree_mut().mark_dirty(owner, FORCE);
        }
    }
}

#[derive(Clone, Default)]
struct PokeRoot<const FORCE: bool> {
    refreshes: u32,
}

impl<const FORCE: bool> Widget for PokeRoot<FORCE> {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.refreshes += 1;
        builder.widget::<Poke<FORCE>>(ContextKey::none());
    }
}

/// Forces its child dirty on every refresh; the child forces it back.
#[derive(Clone, Default)]
struct PingRoot {
    refreshes: u32,
    child: Option<WidgetChild<Pong>>,
}

impl Widget for PingRoot {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.refreshes += 1;
        self.child = builder.widget::<Pong>(ContextKey::none());
        if let Some(child) = self.child {
            builder.tree_mut().mark_dirty(child.widget, true);
        }
    }
}

#[derive(Clone, Default)]
struct Pong;

impl Widget for Pong {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        if let Some(owner) = builder.tree().owner(builder.parent()) {
            builder.tree_mut().mark_dirty(owner, true);
        }
    }
}

#[derive(Clone, Default)]
struct Boom;

impl Widget for Boom {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        builder.widget::<Leaf>(ContextKey::none());
        panic!("boom");
    }
}

#[derive(Clone, Default)]
struct Volatile {
    boom: Option<WidgetChild<Boom>>,
    leaf: Option<WidgetChild<Leaf>>,
}

impl Widget for Volatile {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.boom = builder.widget::<Boom>(ContextKey::id(1));
        self.leaf = builder.widget::<Leaf>(ContextKey::id(2));
    }
}

#[derive(Clone, Default)]
struct Reentrant {
    refreshes: u32,
    nested: Option<Result<(), WidgetError>>,
}

impl Widget for Reentrant {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        self.refreshes += 1;
        let me = builder.parent();
        self.nested = Some(builder.tree_mut().refresh(me));
    }
}

fn refreshes_of<W: Widget>(tree: &WidgetTree, id: WidgetId, read: impl FnOnce(&W) -> u32) -> u32 {
    tree.with_widget::<W, _>(id, read).unwrap()
}

#[test]
fn mark_dirty_reports_state_changes_and_wakes_the_host() {
    let scheduler = Arc::new(CountingScheduler::default());
    let mut tree = WidgetTree::new().with_scheduler(scheduler.clone());
    let root = tree.spawn_root(Leaf::default());
    assert_eq!(scheduler.requests.load(Ordering::SeqCst), 1);
    assert!(tree.needs_tick());

    assert!(!tree.mark_dirty(root, false));
    tree.tick();
    assert!(!tree.needs_tick());
    assert!(tree.mark_dirty(root, false));
    assert_eq!(scheduler.requests.load(Ordering::SeqCst), 2);
    assert!(!tree.mark_dirty(404, false));
}

#[test]
fn tick_advances_the_frame() {
    let mut tree = WidgetTree::new();
    assert_eq!(tree.frame(), 0);
    tree.tick();
    tree.tick();
    assert_eq!(tree.frame(), 2);
}

#[test]
fn deeper_nodes_dirtied_during_a_pass_refresh_in_the_same_tick() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(Outer::default());
    tree.tick();

    let middle = tree
        .with_widget::<Outer, _>(root, |outer| outer.middle)
        .unwrap()
        .unwrap();
    let leaf = tree
        .with_widget::<Middle, _>(middle.widget, |m| m.leaf)
        .unwrap()
        .unwrap();
    assert_eq!(tree.depth(leaf.widget), Some(2));
    assert_eq!(refreshes_of::<Leaf>(&tree, leaf.widget, |l| l.refreshes), 1);

    tree.mark_dirty(middle.widget, false);
    tree.tick();
    assert_eq!(refreshes_of::<Leaf>(&tree, leaf.widget, |l| l.refreshes), 2);
    assert_eq!(refreshes_of::<Outer>(&tree, root, |o| o.refreshes), 1);
    assert!(!tree.needs_tick());
}

#[test]
fn shallower_node_dirtied_during_a_pass_waits_for_the_next_tick() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(PokeRoot::<false>::default());
    tree.tick();

    assert_eq!(refreshes_of::<PokeRoot<false>>(&tree, root, |r| r.refreshes), 1);
    assert!(tree.is_dirty(root));
    assert!(tree.needs_tick());

    tree.tick();
    assert_eq!(refreshes_of::<PokeRoot<false>>(&tree, root, |r| r.refreshes), 2);
    assert!(!tree.is_dirty(root));
}

#[test]
fn forced_shallower_node_refreshes_in_the_same_tick() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(PokeRoot::<true>::default());
    tree.tick();

    assert_eq!(refreshes_of::<PokeRoot<true>>(&tree, root, |r| r.refreshes), 2);
    assert!(!tree.is_dirty(root));
    assert!(!tree.needs_tick());
}

#[test]
fn work_beyond_the_pass_cap_is_deferred_not_dropped() {
    let mut tree = WidgetTree::with_config(TreeConfig::default().with_max_refresh_passes(2));
    let root = tree.spawn_root(PingRoot::default());
    tree.tick();

    assert_eq!(refreshes_of::<PingRoot>(&tree, root, |r| r.refreshes), 3);
    let child = tree
        .with_widget::<PingRoot, _>(root, |r| r.child)
        .unwrap()
        .unwrap();
    assert!(tree.is_dirty(child.widget));
    assert!(tree.needs_tick());

    tree.tick();
    assert!(refreshes_of::<PingRoot>(&tree, root, |r| r.refreshes) > 3);
    assert!(tree.is_spawned(child.widget));
}

#[test]
fn panicking_refresh_is_isolated() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(Volatile::default());
    tree.tick();

    let (boom, leaf) = tree
        .with_widget::<Volatile, _>(root, |v| (v.boom, v.leaf))
        .unwrap();
    let (boom, leaf) = (boom.unwrap(), leaf.unwrap());

    assert!(tree.has_refreshed(leaf.widget));
    assert!(!tree.has_refreshed(boom.widget));
    assert!(!tree.is_refreshing(boom.widget));
    assert!(tree.is_dirty(boom.widget));
    assert!(tree.needs_tick());
    // the session opened before the panic was still closed
    assert_eq!(tree.children(boom.widget).len(), 1);

    let err = tree.refresh(boom.widget).unwrap_err();
    assert_eq!(
        err,
        WidgetError::RefreshPanicked {
            id: boom.widget,
            message: "boom".to_owned(),
        }
    );
    assert!(tree.with_widget::<Boom, _>(boom.widget, |_| ()).is_ok());
}

#[test]
fn refreshing_from_inside_refresh_is_ignored() {
    let mut tree = WidgetTree::new();
    let root = tree.spawn_root(Reentrant::default());
    tree.tick();

    let (count, nested) = tree
        .with_widget::<Reentrant, _>(root, |r| (r.refreshes, r.nested.clone()))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(nested, Some(Ok(())));
}

#[test]
fn refresh_of_missing_or_released_nodes_fails() {
    let mut tree = WidgetTree::new();
    assert_eq!(tree.refresh(7), Err(WidgetError::Missing { id: 7 }));

    let root = tree.spawn_root(Outer::default());
    tree.tick();
    let middle = tree
        .with_widget::<Outer, _>(root, |o| o.middle)
        .unwrap()
        .unwrap();
    tree.release(middle.instance);
    assert_eq!(
        tree.refresh(middle.instance),
        Err(WidgetError::Released {
            id: middle.instance
        })
    );
}

#[test]
fn template_roots_are_never_refreshed() {
    let mut tree = WidgetTree::new();
    let archetype = tree.create_archetype(Leaf::default());
    assert_eq!(tree.refresh(archetype), Ok(()));
    assert!(!tree.has_refreshed(archetype));
    assert!(!tree.mark_dirty(archetype, true));
}
