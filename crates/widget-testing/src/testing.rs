use std::cell::{Ref, RefCell};
use std::rc::Rc;

use widget_core::{HostNode, LayoutHost, MemoryScene, TreeConfig, Widget, WidgetId, WidgetTree};

/// Layout host that remembers every rebuild hint it receives.
#[derive(Debug, Default)]
pub struct RecordingLayout {
    requests: Vec<HostNode>,
}

impl RecordingLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[HostNode] {
        &self.requests
    }

    pub fn take_requests(&mut self) -> Vec<HostNode> {
        std::mem::take(&mut self.requests)
    }
}

impl LayoutHost for RecordingLayout {
    fn request_rebuild(&mut self, node: HostNode) {
        self.requests.push(node);
    }
}

/// Headless harness for exercising widget trees in tests.
///
/// Owns a tree wired to an in-memory scene and a recording layout host, and
/// exposes helpers for ticking until the tree settles.
pub struct TreeTestRule {
    tree: WidgetTree,
    scene: Rc<RefCell<MemoryScene>>,
    layout: Rc<RefCell<RecordingLayout>>,
    root: Option<WidgetId>,
    max_ticks: usize,
}

impl TreeTestRule {
    pub const DEFAULT_MAX_TICKS: usize = 64;

    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        let scene = Rc::new(RefCell::new(MemoryScene::new()));
        let layout = Rc::new(RefCell::new(RecordingLayout::new()));
        let tree = WidgetTree::with_config(config)
            .with_scene(Rc::clone(&scene))
            .with_layout(Rc::clone(&layout));
        Self {
            tree,
            scene,
            layout,
            root: None,
            max_ticks: Self::DEFAULT_MAX_TICKS,
        }
    }

    /// Caps the number of ticks [`pump_until_idle`](Self::pump_until_idle) runs.
    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks.max(1);
        self
    }

    /// Spawns `widget` as the root and ticks until the tree is idle.
    pub fn set_content<T: Widget>(&mut self, widget: T) -> WidgetId {
        let root = self.tree.spawn_root(widget);
        self.root = Some(root);
        self.pump_until_idle();
        root
    }

    pub fn tick(&mut self) {
        self.tree.tick();
    }

    /// Ticks until no refresh or release is pending. Returns the number of
    /// ticks run; stops at the tick cap even if work remains.
    pub fn pump_until_idle(&mut self) -> usize {
        let mut ticks = 0;
        while self.tree.needs_tick() {
            if ticks == self.max_ticks {
                log::warn!("tree still busy after {ticks} ticks");
                break;
            }
            self.tree.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn is_idle(&self) -> bool {
        !self.tree.needs_tick()
    }

    pub fn root_id(&self) -> Option<WidgetId> {
        self.root
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut self.tree
    }

    pub fn scene(&self) -> Ref<'_, MemoryScene> {
        self.scene.borrow()
    }

    /// Host nodes of the children of `id` as the scene currently orders them.
    pub fn scene_children(&self, id: WidgetId) -> Vec<HostNode> {
        match self.tree.host(id) {
            Some(host) => self.scene.borrow().children(host).to_vec(),
            None => Vec::new(),
        }
    }

    pub fn layout_requests(&self) -> Vec<HostNode> {
        self.layout.borrow().requests().to_vec()
    }

    pub fn take_layout_requests(&mut self) -> Vec<HostNode> {
        self.layout.borrow_mut().take_requests()
    }

    /// The widget tree below the root, one node per line.
    pub fn dump_tree(&self) -> String {
        match self.root {
            Some(root) => self.tree.dump_tree(root),
            None => String::from("(no root)\n"),
        }
    }

    /// The host scene below the root's host node.
    pub fn dump_scene(&self) -> String {
        let host = self.root.and_then(|root| self.tree.host(root));
        self.scene.borrow().dump_tree(host)
    }
}

impl Default for TreeTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`TreeTestRule`].
pub fn run_test_tree<R>(f: impl FnOnce(&mut TreeTestRule) -> R) -> R {
    let mut rule = TreeTestRule::new();
    f(&mut rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{ItemList, Label};

    #[test]
    fn rule_settles_content_and_records_layout() {
        run_test_tree(|rule| {
            assert!(rule.root_id().is_none());
            assert_eq!(rule.dump_tree(), "(no root)\n");

            let root = rule.set_content(ItemList::new(["a", "b"]));
            assert!(rule.is_idle());
            assert_eq!(rule.root_id(), Some(root));
            assert_eq!(rule.scene_children(root).len(), 2);

            let requests = rule.take_layout_requests();
            let root_host = rule.tree().host(root).unwrap();
            assert!(requests.contains(&root_host));
            assert!(rule.layout_requests().is_empty());

            let children = rule.tree().children(root).to_vec();
            for child in children {
                assert!(rule.tree().is_type::<Label>(child.widget));
            }
        });
    }

    #[test]
    fn pump_reports_the_ticks_run() {
        let mut rule = TreeTestRule::new().with_max_ticks(2);
        let root = rule.tree_mut().spawn_root(Label::new("x"));
        rule.tree_mut().mark_dirty(root, false);
        assert_eq!(rule.pump_until_idle(), 1);
        assert_eq!(rule.pump_until_idle(), 0);
    }
}
