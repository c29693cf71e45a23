//! Host boundary: the scene graph that owns the visible representation of
//! each widget node, and the layout pass that consumes rebuild hints.
//!
//! The tree mirrors its structure into the host: every node gets a host
//! node, parents and sibling indices are kept in step with reconciliation,
//! pooled instances are deactivated and detached.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

/// Handle to a node in the host scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(pub usize);

pub trait SceneHost {
    /// Creates a host node, optionally cloned from the host node of a template.
    fn create_node(&mut self, name: &str, template: Option<HostNode>) -> HostNode;
    fn destroy_node(&mut self, node: HostNode);
    fn set_active(&mut self, node: HostNode, active: bool);
    /// Moves `node` under `parent` (appended last), or detaches it with `None`.
    fn set_parent(&mut self, node: HostNode, parent: Option<HostNode>);
    fn sibling_index(&self, node: HostNode) -> usize;
    fn set_sibling_index(&mut self, node: HostNode, index: usize);
    fn child_count(&self, node: HostNode) -> usize;
    fn child(&self, node: HostNode, index: usize) -> Option<HostNode>;
}

pub trait LayoutHost {
    /// Fire-and-forget hint that the layout under `node` must be rebuilt.
    fn request_rebuild(&mut self, node: HostNode);
}

/// Layout host that ignores every hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLayout;

impl LayoutHost for NoopLayout {
    fn request_rebuild(&mut self, _node: HostNode) {}
}

impl<S: SceneHost> SceneHost for Rc<RefCell<S>> {
    fn create_node(&mut self, name: &str, template: Option<HostNode>) -> HostNode {
        self.borrow_mut().create_node(name, template)
    }

    fn destroy_node(&mut self, node: HostNode) {
        self.borrow_mut().destroy_node(node)
    }

    fn set_active(&mut self, node: HostNode, active: bool) {
        self.borrow_mut().set_active(node, active)
    }

    fn set_parent(&mut self, node: HostNode, parent: Option<HostNode>) {
        self.borrow_mut().set_parent(node, parent)
    }

    fn sibling_index(&self, node: HostNode) -> usize {
        self.borrow().sibling_index(node)
    }

    fn set_sibling_index(&mut self, node: HostNode, index: usize) {
        self.borrow_mut().set_sibling_index(node, index)
    }

    fn child_count(&self, node: HostNode) -> usize {
        self.borrow().child_count(node)
    }

    fn child(&self, node: HostNode, index: usize) -> Option<HostNode> {
        self.borrow().child(node, index)
    }
}

impl<L: LayoutHost> LayoutHost for Rc<RefCell<L>> {
    fn request_rebuild(&mut self, node: HostNode) {
        self.borrow_mut().request_rebuild(node)
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    parent: Option<HostNode>,
    children: Vec<HostNode>,
    active: bool,
    template: Option<HostNode>,
}

/// In-memory scene graph. Destroying a node destroys its subtree.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: Vec<Option<SceneNode>>, // FUTURE(no_std): migrate to arena-backed node storage.
}

impl MemoryScene {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of live host nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: HostNode) -> bool {
        self.get(node).is_some()
    }

    pub fn is_active(&self, node: HostNode) -> bool {
        self.get(node).is_some_and(|n| n.active)
    }

    pub fn parent(&self, node: HostNode) -> Option<HostNode> {
        self.get(node).and_then(|n| n.parent)
    }

    pub fn name(&self, node: HostNode) -> Option<&str> {
        self.get(node).map(|n| n.name.as_str())
    }

    pub fn template(&self, node: HostNode) -> Option<HostNode> {
        self.get(node).and_then(|n| n.template)
    }

    pub fn children(&self, node: HostNode) -> &[HostNode] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn dump_tree(&self, root: Option<HostNode>) -> String {
        let mut output = String::new();
        match root {
            Some(root) => self.dump_node(&mut output, root, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_node(&self, output: &mut String, node: HostNode, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.get(node) {
            Some(entry) => {
                let marker = if entry.active { "" } else { " (inactive)" };
                let _ = writeln!(output, "{indent}[{}] {}{marker}", node.0, entry.name);
                for child in &entry.children {
                    self.dump_node(output, *child, depth + 1);
                }
            }
            None => {
                let _ = writeln!(output, "{indent}[{}] (missing)", node.0);
            }
        }
    }

    fn get(&self, node: HostNode) -> Option<&SceneNode> {
        self.nodes.get(node.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, node: HostNode) -> Option<&mut SceneNode> {
        self.nodes.get_mut(node.0).and_then(Option::as_mut)
    }

    fn detach(&mut self, node: HostNode) {
        let Some(parent) = self.get_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != node);
        }
    }
}

impl SceneHost for MemoryScene {
    fn create_node(&mut self, name: &str, template: Option<HostNode>) -> HostNode {
        let id = HostNode(self.nodes.len());
        self.nodes.push(Some(SceneNode {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            active: true,
            template,
        }));
        id
    }

    fn destroy_node(&mut self, node: HostNode) {
        self.detach(node);
        let children = match self.nodes.get_mut(node.0).and_then(Option::take) {
            Some(entry) => entry.children,
            None => return,
        };
        for child in children {
            // the child still points at the removed parent; clear that first
            if let Some(entry) = self.get_mut(child) {
                entry.parent = None;
            }
            self.destroy_node(child);
        }
    }

    fn set_active(&mut self, node: HostNode, active: bool) {
        if let Some(entry) = self.get_mut(node) {
            entry.active = active;
        }
    }

    fn set_parent(&mut self, node: HostNode, parent: Option<HostNode>) {
        if !self.contains(node) {
            return;
        }
        self.detach(node);
        let Some(parent) = parent.filter(|p| self.contains(*p)) else {
            return;
        };
        if let Some(entry) = self.get_mut(parent) {
            entry.children.push(node);
        }
        if let Some(entry) = self.get_mut(node) {
            entry.parent = Some(parent);
        }
    }

    fn sibling_index(&self, node: HostNode) -> usize {
        self.parent(node)
            .and_then(|parent| self.children(parent).iter().position(|c| *c == node))
            .unwrap_or(0)
    }

    fn set_sibling_index(&mut self, node: HostNode, index: usize) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(entry) = self.get_mut(parent) {
            entry.children.retain(|child| *child != node);
            let index = index.min(entry.children.len());
            entry.children.insert(index, node);
        }
    }

    fn child_count(&self, node: HostNode) -> usize {
        self.children(node).len()
    }

    fn child(&self, node: HostNode, index: usize) -> Option<HostNode> {
        self.children(node).get(index).copied()
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
