//! The tree service: owns every node, the instance pools, the dirty queues
//! and the host collaborators.

use std::any::{type_name, TypeId};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::builder::Builder;
use crate::collections::{FastMap, OrderedSet};
use crate::host::{HostNode, LayoutHost, MemoryScene, NoopLayout, SceneHost};
use crate::node::{ChildRecord, CollectionKind, WidgetNode};
use crate::platform::{DefaultScheduler, FrameScheduler};
use crate::pool::InstancePool;
use crate::scheduler::DirtyQueues;
use crate::{ContextKey, Sorting, StatefulWidget, Widget, WidgetError, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Forward/backward sweeps per tick before leftover work is deferred.
    pub max_refresh_passes: usize,
    /// Pooled instances kept per archetype; `None` keeps all of them.
    pub pool_limit: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_refresh_passes: 3,
            pool_limit: None,
        }
    }
}

impl TreeConfig {
    pub fn with_max_refresh_passes(mut self, passes: usize) -> Self {
        self.max_refresh_passes = passes.max(1);
        self
    }

    pub fn with_pool_limit(mut self, limit: usize) -> Self {
        self.pool_limit = Some(limit);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Releasing,
    Refreshing,
}

pub struct WidgetTree {
    pub(crate) nodes: Vec<Option<WidgetNode>>, // FUTURE(no_std): replace Vec with a slab that reports capacity.
    pub(crate) pools: InstancePool,
    pub(crate) type_archetypes: FastMap<TypeId, WidgetId>,
    pub(crate) queues: DirtyQueues,
    pub(crate) delayed_releases: OrderedSet<WidgetId>,
    pub(crate) scene: Box<dyn SceneHost>,
    pub(crate) layout: Box<dyn LayoutHost>,
    pub(crate) scheduler: Arc<dyn FrameScheduler>,
    pub(crate) config: TreeConfig,
    pub(crate) frame: u64,
    pub(crate) phase: TickPhase,
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            pools: InstancePool::new(),
            type_archetypes: FastMap::default(),
            queues: DirtyQueues::default(),
            delayed_releases: OrderedSet::default(),
            scene: Box::new(MemoryScene::new()),
            layout: Box::new(NoopLayout),
            scheduler: Arc::new(DefaultScheduler),
            config,
            frame: 0,
            phase: TickPhase::Idle,
        }
    }

    /// Replaces the host scene. Must be called before any node is created.
    pub fn with_scene(mut self, scene: impl SceneHost + 'static) -> Self {
        debug_assert!(self.nodes.is_empty(), "scene replaced after nodes were created");
        self.scene = Box::new(scene);
        self
    }

    pub fn with_layout(mut self, layout: impl LayoutHost + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn scene(&self) -> &dyn SceneHost {
        self.scene.as_ref()
    }

    /// Creates a live root at depth 0 that owns itself, dirty so that the next
    /// tick refreshes it.
    pub fn spawn_root<T: Widget>(&mut self, widget: T) -> WidgetId {
        let id = self.alloc(Box::new(widget), TypeId::of::<T>(), type_name::<T>(), None);
        if let Some(node) = self.node_mut(id) {
            node.flags.active = true;
        }
        log::trace!("spawned root {id}");
        self.mark_dirty(id, false);
        id
    }

    /// Registers an inactive template root that instances can be cloned from.
    pub fn create_archetype<T: Widget>(&mut self, widget: T) -> WidgetId {
        let id = self.alloc(Box::new(widget), TypeId::of::<T>(), type_name::<T>(), None);
        let host = match self.node_mut(id) {
            Some(node) => {
                node.archetype = Some(id);
                node.host
            }
            None => return id,
        };
        self.scene.set_active(host, false);
        id
    }

    /// Appends a template-declared child to `parent`. Instances cloned from
    /// `parent` carry a copy of it.
    pub fn add_template_child<T: Widget>(
        &mut self,
        parent: WidgetId,
        widget: T,
    ) -> Result<WidgetId, WidgetError> {
        let parent_node = self.node(parent).ok_or(WidgetError::Missing { id: parent })?;
        if parent_node.flags.released {
            return Err(WidgetError::Released { id: parent });
        }
        let (parent_host, depth, index, active, owner, context) = (
            parent_node.host,
            parent_node.depth + 1,
            parent_node.static_children.len(),
            parent_node.flags.active,
            parent_node.owner,
            parent_node.context,
        );

        let id = self.alloc(Box::new(widget), TypeId::of::<T>(), type_name::<T>(), Some(parent_host));
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(parent);
            node.archetype = Some(id);
            node.owner = owner;
            node.context = context;
            node.depth = depth;
            node.sorting = Sorting::new(Sorting::STATIC_CHILDREN, index);
            node.widget_index = index;
            node.flags.active = active;
        }
        if let Some(node) = self.node_mut(parent) {
            node.static_children.push(id);
        }
        self.sort_children(parent);
        if active {
            self.mark_dirty(id, false);
        }
        Ok(id)
    }

    /// Opens a declaration session on `parent` on behalf of `owner`. When
    /// `parent == owner` the parent's own children are edited, otherwise the
    /// children `owner` declares into it.
    pub fn builder(&mut self, parent: WidgetId, owner: WidgetId) -> Builder<'_> {
        Builder::open(self, parent, owner)
    }

    pub fn with_widget<W: Widget, R>(
        &self,
        id: WidgetId,
        f: impl FnOnce(&W) -> R,
    ) -> Result<R, WidgetError> {
        let node = self.node(id).ok_or(WidgetError::Missing { id })?;
        if node.flags.released {
            return Err(WidgetError::Released { id });
        }
        let behaviour = node.behaviour.as_ref().ok_or(WidgetError::Busy { id })?;
        let widget = behaviour
            .as_any()
            .downcast_ref::<W>()
            .ok_or(WidgetError::TypeMismatch {
                id,
                expected: type_name::<W>(),
            })?;
        Ok(f(widget))
    }

    pub fn with_widget_mut<W: Widget, R>(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut W) -> R,
    ) -> Result<R, WidgetError> {
        let node = self.node_mut(id).ok_or(WidgetError::Missing { id })?;
        if node.flags.released {
            return Err(WidgetError::Released { id });
        }
        let behaviour = node.behaviour.as_mut().ok_or(WidgetError::Busy { id })?;
        let widget = behaviour
            .as_any_mut()
            .downcast_mut::<W>()
            .ok_or(WidgetError::TypeMismatch {
                id,
                expected: type_name::<W>(),
            })?;
        Ok(f(widget))
    }

    /// Stores `state` on the widget. The node is marked dirty when the value
    /// changed or `force` is set; returns whether it was.
    pub fn set_state<W: StatefulWidget>(
        &mut self,
        id: WidgetId,
        state: W::State,
        force: bool,
    ) -> Result<bool, WidgetError> {
        let changed = self.with_widget_mut::<W, _>(id, |widget| {
            if *widget.state() == state {
                false
            } else {
                *widget.state_mut() = state;
                true
            }
        })?;
        if changed || force {
            Ok(self.mark_dirty(id, false))
        } else {
            Ok(false)
        }
    }

    pub fn state<W: StatefulWidget>(&self, id: WidgetId) -> Result<W::State, WidgetError> {
        self.with_widget::<W, _>(id, |widget| widget.state().clone())
    }

    pub fn is_type<T: Widget>(&self, id: WidgetId) -> bool {
        self.node(id)
            .is_some_and(|node| node.type_id == TypeId::of::<T>())
    }

    /// Node exists (was not destroyed).
    pub fn contains(&self, id: WidgetId) -> bool {
        self.node(id).is_some()
    }

    /// Node is live in the tree: active and not released.
    pub fn is_spawned(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(WidgetNode::is_spawned)
    }

    pub fn is_active(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.active)
    }

    pub fn is_dirty(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.dirty)
    }

    pub fn has_refreshed(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.has_refreshed)
    }

    pub fn is_releasing(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.releasing)
    }

    pub fn is_released(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.released)
    }

    pub fn is_refreshing(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| node.flags.refreshing)
    }

    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn owner(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).and_then(|node| node.owner)
    }

    pub fn archetype(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).and_then(|node| node.archetype)
    }

    pub fn depth(&self, id: WidgetId) -> Option<usize> {
        self.node(id).map(|node| node.depth)
    }

    pub fn sorting(&self, id: WidgetId) -> Option<Sorting> {
        self.node(id).map(|node| node.sorting)
    }

    pub fn context(&self, id: WidgetId) -> Option<ContextKey> {
        self.node(id).map(|node| node.context)
    }

    pub fn widget_index(&self, id: WidgetId) -> Option<usize> {
        self.node(id).map(|node| node.widget_index)
    }

    pub fn host(&self, id: WidgetId) -> Option<HostNode> {
        self.node(id).map(|node| node.host)
    }

    pub fn name(&self, id: WidgetId) -> Option<&str> {
        self.node(id).map(WidgetNode::display_name)
    }

    /// Every child of the node in sibling order.
    pub fn children(&self, id: WidgetId) -> &[ChildRecord] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn template_children(&self, id: WidgetId) -> &[WidgetId] {
        self.node(id).map_or(&[], |node| node.static_children.as_slice())
    }

    /// Children the node declared itself, in sibling order.
    pub fn internal_children(&self, id: WidgetId) -> &[ChildRecord] {
        self.node(id)
            .map_or(&[], |node| node.internal.in_order.as_slice())
    }

    /// Children declared into the node by its owner, in sibling order.
    pub fn owner_children(&self, id: WidgetId) -> &[ChildRecord] {
        self.node(id)
            .map_or(&[], |node| node.owner_declared.in_order.as_slice())
    }

    /// Whether the last session on either of the node's collections changed
    /// the order of its children.
    pub fn order_changed(&self, id: WidgetId) -> bool {
        self.node(id)
            .is_some_and(|node| node.internal.order_changed || node.owner_declared.order_changed)
    }

    /// The lazily created default archetype of `T`, if one exists yet.
    pub fn type_archetype_of<T: Widget>(&self) -> Option<WidgetId> {
        self.type_archetypes.get(&TypeId::of::<T>()).copied()
    }

    pub fn pooled_count(&self, archetype: WidgetId) -> usize {
        self.pools.len_for(archetype)
    }

    pub fn total_pooled(&self) -> usize {
        self.pools.len()
    }

    pub fn is_pooled(&self, id: WidgetId) -> bool {
        self.archetype(id)
            .is_some_and(|archetype| self.pools.contains(archetype, id))
    }

    pub fn pending_releases(&self) -> usize {
        self.delayed_releases.len()
    }

    /// Number of nodes that exist (live, pooled, templates).
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dump_tree(&self, root: WidgetId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: WidgetId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        let mut marks = String::new();
        if node.flags.dirty {
            marks.push_str(" dirty");
        }
        if node.flags.releasing {
            marks.push_str(" releasing");
        }
        if !node.flags.active {
            marks.push_str(" inactive");
        }
        let _ = writeln!(
            output,
            "{indent}[{id}] {} ({}){marks}",
            node.display_name(),
            node.sorting
        );
        for child in &node.children {
            self.dump_node(output, child.instance, depth + 1);
        }
    }

    pub(crate) fn node(&self, id: WidgetId) -> Option<&WidgetNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: WidgetId) -> Option<&mut WidgetNode> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Creates a node and its host node, parented under `host_parent`.
    pub(crate) fn alloc(
        &mut self,
        behaviour: Box<dyn Widget>,
        type_id: TypeId,
        type_name: &'static str,
        host_parent: Option<HostNode>,
    ) -> WidgetId {
        let host = self.scene.create_node(behaviour.name(), None);
        if host_parent.is_some() {
            self.scene.set_parent(host, host_parent);
        }
        self.push_node(WidgetNode::new(behaviour, type_id, type_name, host))
    }

    pub(crate) fn push_node(&mut self, node: WidgetNode) -> WidgetId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    /// Whether `node` is `ancestor` or lies below it, following parent links.
    pub(crate) fn is_descendant_or_self(&self, node: WidgetId, ancestor: WidgetId) -> bool {
        let mut current = Some(node);
        // parent links cannot cycle, but a corrupted chain must not hang
        for _ in 0..=self.nodes.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.parent(id),
                None => return false,
            }
        }
        false
    }

    /// Rebuilds the node's full child list by sorting and mirrors the order to
    /// the host.
    pub(crate) fn sort_children(&mut self, id: WidgetId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let static_len = node.static_children.len();
        let managed = static_len + node.internal.len() + node.owner_declared.len();
        let parent_host = node.host;
        let candidates: Vec<ChildRecord> = node
            .static_children
            .iter()
            .map(|child| ChildRecord::single(*child))
            .chain(node.internal.in_order.iter().copied())
            .chain(node.owner_declared.in_order.iter().copied())
            .collect();
        let offset = self.scene.child_count(parent_host).saturating_sub(managed);

        let mut children: Vec<ChildRecord> = Vec::with_capacity(candidates.len());
        for (position, record) in candidates.into_iter().enumerate() {
            let Some(child) = self.node(record.instance) else {
                continue;
            };
            // template children always stay; declared ones only while live
            if position >= static_len && !child.is_spawned() {
                continue;
            }
            let child_host = child.host;
            let at = crate::children::insert_sorted_by(&mut children, record, |r| {
                self.node(r.instance).map(|n| n.sorting).unwrap_or_default()
            });
            self.scene.set_sibling_index(child_host, offset + at);
        }

        if log::log_enabled!(log::Level::Trace) {
            for (index, record) in children.iter().enumerate() {
                log::trace!(
                    "{id} sorted child [{index}] {} sorting: {}",
                    record.instance,
                    self.sorting(record.instance).unwrap_or_default()
                );
            }
        }

        if let Some(node) = self.node_mut(id) {
            node.children = children;
        }
        self.layout.request_rebuild(parent_host);
    }

    pub(crate) fn collection_kind(parent: WidgetId, owner: WidgetId) -> CollectionKind {
        if parent == owner {
            CollectionKind::Internal
        } else {
            CollectionKind::Owner
        }
    }
}
