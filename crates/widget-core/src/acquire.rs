//! Producing instances for declared children: template resolution, pool
//! reuse, cloning and the backwalk into nested template nodes.

use std::any::{type_name, TypeId};

use crate::host::HostNode;
use crate::node::{ChildRecord, WidgetNode};
use crate::widget::Template;
use crate::{ContextKey, Sorting, Widget, WidgetId, WidgetTree};

/// Outcome of resolving a declaration's template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved {
    /// Template root to instantiate; `None` builds a fresh node from
    /// `T::default()` that acts as its own archetype.
    pub archetype: Option<WidgetId>,
    /// Node inside `archetype` the declaration asks for, when it is not the
    /// root itself.
    pub widget: Option<WidgetId>,
}

impl WidgetTree {
    /// The default archetype for `T`, created on first use.
    pub(crate) fn type_archetype<T: Widget + Default>(&mut self) -> WidgetId {
        let key = TypeId::of::<T>();
        if let Some(id) = self.type_archetypes.get(&key).copied() {
            if self.contains(id) {
                return id;
            }
        }
        let id = self.create_archetype(T::default());
        log::trace!("created type archetype {id} for {}", type_name::<T>());
        self.type_archetypes.insert(key, id);
        id
    }

    /// Picks the archetype a declaration instantiates from, refusing
    /// templates that would contain the declaring parent or owner.
    pub(crate) fn resolve_template<T: Widget + Default>(
        &mut self,
        template: Template<T>,
        parent: WidgetId,
        owner: WidgetId,
    ) -> Resolved {
        let mut widget = template.widget;
        if let Some(id) = widget {
            if !self.is_type::<T>(id) {
                log::error!(
                    "template {id} is not a {}; using the type default",
                    type_name::<T>()
                );
                return Resolved {
                    archetype: Some(self.type_archetype::<T>()),
                    widget: None,
                };
            }
        }
        let root = template.root.filter(|root| {
            let known = self.contains(*root);
            if !known {
                log::error!("template root {root} does not exist; ignoring it");
            }
            known
        });

        let mut archetype = match root.or(widget) {
            Some(id) => Some(id),
            None => Some(self.type_archetype::<T>()),
        };

        if let Some(id) = widget {
            if self.holds_requester(id, parent, owner) {
                log::error!("template {id} contains {parent} or its owner {owner}; building a plain instance");
                widget = None;
                archetype = None;
            }
        }

        if let (Some(id), Some(root)) = (widget, archetype) {
            if !self.is_descendant_or_self(id, root) {
                log::error!("did not find template root {root} above template {id}");
                archetype = Some(id);
            }
        }

        if let Some(root) = archetype {
            if self.holds_requester(root, parent, owner) {
                log::error!("template {root} for parent {parent} (owner {owner}) appears to be cyclic");
                // `widget` was already checked above
                archetype = widget;
            }
        }

        if widget == archetype {
            widget = None;
        }
        Resolved { archetype, widget }
    }

    /// Whether `template` is the declaring parent or owner, or one of their
    /// ancestors.
    fn holds_requester(&self, template: WidgetId, parent: WidgetId, owner: WidgetId) -> bool {
        self.is_descendant_or_self(parent, template) || self.is_descendant_or_self(owner, template)
    }

    /// Whether an existing child can stand for a declaration resolved to
    /// `resolved`.
    pub(crate) fn can_reuse<T: Widget>(&self, record: ChildRecord, resolved: &Resolved) -> bool {
        let Some(widget) = self.node(record.widget) else {
            return false;
        };
        if widget.type_id != TypeId::of::<T>() || !widget.is_spawned() {
            return false;
        }
        let Some(instance) = self.node(record.instance) else {
            return false;
        };
        if instance.flags.releasing || !instance.is_spawned() {
            return false;
        }
        match resolved.archetype {
            Some(archetype) => instance.archetype == Some(archetype),
            None => instance.archetype == Some(record.instance),
        }
    }

    /// Produces a live instance under `parent`, from the pool if possible.
    pub(crate) fn acquire<T: Widget + Default>(
        &mut self,
        resolved: Resolved,
        parent: WidgetId,
        owner: WidgetId,
        context: ContextKey,
        sorting: Sorting,
    ) -> Option<ChildRecord> {
        let parent_host = self.host(parent)?;

        let record = match resolved.archetype {
            None => {
                let id = self.alloc(
                    Box::new(T::default()),
                    TypeId::of::<T>(),
                    type_name::<T>(),
                    Some(parent_host),
                );
                ChildRecord::single(id)
            }
            Some(archetype) => {
                let path = match resolved.widget {
                    Some(widget) => match self.backwalk_path(widget, archetype) {
                        Some(path) => path,
                        None => {
                            log::error!("template {widget} is not a template child of {archetype}");
                            return None;
                        }
                    },
                    None => Vec::new(),
                };

                let nodes = &self.nodes;
                let pooled = self.pools.dequeue(archetype, |id| {
                    nodes
                        .get(id)
                        .and_then(Option::as_ref)
                        .is_some_and(|node| node.flags.released)
                });
                let instance = match pooled {
                    Some(id) => {
                        log::trace!("reusing pooled {id} of {archetype}");
                        if let Some(host) = self.host(id) {
                            self.scene.set_parent(host, Some(parent_host));
                        }
                        id
                    }
                    None => self.instantiate(archetype, Some(parent_host))?,
                };

                match self.follow_path(instance, &path) {
                    Some(widget) if self.is_type::<T>(widget) => ChildRecord { instance, widget },
                    _ => {
                        log::error!("backwalk from {instance} did not reach a {}", type_name::<T>());
                        if let Some(host) = self.host(instance) {
                            self.scene.set_parent(host, None);
                        }
                        self.mark_released(instance);
                        self.pools.enqueue(archetype, instance);
                        return None;
                    }
                }
            }
        };

        self.init(
            record.instance,
            resolved.archetype,
            Some(parent),
            owner,
            context,
            sorting,
        );
        self.activate(record.instance);
        log::trace!(
            "acquired {} ({} -> {}) under {parent}",
            self.name(record.widget).unwrap_or("?"),
            record.instance,
            record.widget
        );
        Some(record)
    }

    /// Clones a template hierarchy. The copy is inactive and released until
    /// it is initialised.
    fn instantiate(&mut self, source: WidgetId, host_parent: Option<HostNode>) -> Option<WidgetId> {
        let template = self.node(source)?;
        let Some(behaviour) = template.behaviour.as_ref().map(|b| b.clone_widget()) else {
            log::warn!("template {source} is refreshing and cannot be cloned");
            return None;
        };
        let (type_id, full_name, template_host) =
            (template.type_id, template.type_name, template.host);
        let statics = template.static_children.clone();

        let host = self.scene.create_node(behaviour.name(), Some(template_host));
        if host_parent.is_some() {
            self.scene.set_parent(host, host_parent);
        }
        let mut node = WidgetNode::new(behaviour, type_id, full_name, host);
        node.archetype = Some(source);
        node.flags.released = true;
        let id = self.push_node(node);

        for (index, child) in statics.into_iter().enumerate() {
            let Some(copy) = self.instantiate(child, Some(host)) else {
                continue;
            };
            if let Some(node) = self.node_mut(copy) {
                node.parent = Some(id);
                node.sorting = Sorting::new(Sorting::STATIC_CHILDREN, index);
                node.widget_index = index;
            }
            if let Some(node) = self.node_mut(id) {
                node.static_children.push(copy);
            }
        }
        Some(id)
    }

    /// Positions of `widget` and each of its ancestors among their parents'
    /// template children, from just below `root` down to `widget`.
    pub(crate) fn backwalk_path(&self, widget: WidgetId, root: WidgetId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = widget;
        while current != root {
            if path.len() > self.nodes.len() {
                return None;
            }
            let parent = self.parent(current)?;
            let position = self
                .node(parent)?
                .static_children
                .iter()
                .position(|child| *child == current)?;
            path.push(position);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    pub(crate) fn follow_path(&self, root: WidgetId, path: &[usize]) -> Option<WidgetId> {
        path.iter().try_fold(root, |current, position| {
            self.node(current)?.static_children.get(*position).copied()
        })
    }

    /// Prepares a node for (re)use under `parent`. Template children are
    /// initialised from the matching template children of `archetype`.
    pub(crate) fn init(
        &mut self,
        id: WidgetId,
        archetype: Option<WidgetId>,
        parent: Option<WidgetId>,
        owner: WidgetId,
        context: ContextKey,
        sorting: Sorting,
    ) {
        let archetype = archetype.unwrap_or(id);
        let depth = parent
            .and_then(|parent| self.depth(parent))
            .map_or(0, |depth| depth + 1);
        let template_children = self
            .node(archetype)
            .map(|node| node.static_children.clone())
            .unwrap_or_default();

        let statics = match self.node_mut(id) {
            Some(node) => {
                debug_assert!(node.internal.is_empty(), "{id} initialised with declared children");
                debug_assert!(node.owner_declared.is_empty(), "{id} initialised with owner children");
                node.archetype = Some(archetype);
                node.parent = parent;
                node.owner = Some(owner);
                node.depth = depth;
                node.context = context;
                node.sorting = sorting;
                node.widget_index = 0;
                node.flags.has_refreshed = false;
                node.flags.releasing = false;
                node.flags.released = false;
                node.internal.clear();
                node.owner_declared.clear();
                node.children = node
                    .static_children
                    .iter()
                    .map(|child| ChildRecord::single(*child))
                    .collect();
                node.static_children.clone()
            }
            None => return,
        };

        for (index, child) in statics.into_iter().enumerate() {
            let child_archetype = if archetype == id {
                None
            } else {
                template_children.get(index).copied()
            };
            self.init(
                child,
                child_archetype,
                Some(id),
                owner,
                context,
                Sorting::new(Sorting::STATIC_CHILDREN, index),
            );
        }
        log::trace!("{id} initialised at depth {depth}");
    }

    /// Makes an initialised instance and its template children live and dirty.
    fn activate(&mut self, id: WidgetId) {
        let (host, statics) = match self.node_mut(id) {
            Some(node) => {
                node.flags.active = true;
                (node.host, node.static_children.clone())
            }
            None => return,
        };
        self.scene.set_active(host, true);
        self.mark_dirty(id, false);
        for child in statics {
            self.activate(child);
        }
    }

    fn mark_released(&mut self, id: WidgetId) {
        let statics = match self.node_mut(id) {
            Some(node) => {
                node.flags.released = true;
                node.flags.active = false;
                node.static_children.clone()
            }
            None => return,
        };
        for child in statics {
            self.mark_released(child);
        }
    }
}

#[cfg(test)]
#[path = "tests/acquire_tests.rs"]
mod tests;
