//! Releasing nodes: deferred exits, pooling, destruction.

use crate::{WidgetId, WidgetTree};

impl WidgetTree {
    /// Releases a live node. If the node is not ready yet (its
    /// [`Widget::try_to_release`](crate::Widget::try_to_release) returns
    /// `false`) it stays live in the releasing state and is retried once per
    /// tick. Template children are released with their instance only.
    pub fn release(&mut self, id: WidgetId) {
        if !self.is_spawned(id) || self.refuse_template_child(id) {
            return;
        }
        // already waiting; asked again on the next tick
        if self.delayed_releases.contains(&id) {
            return;
        }
        if !self.ask_ready_to_release(id) {
            log::trace!("{id} release deferred");
            self.delayed_releases.insert(id);
            self.scheduler.schedule_frame();
            return;
        }
        self.release_immediately(id);
    }

    /// Template children live and die with the instance that holds them.
    fn refuse_template_child(&self, id: WidgetId) -> bool {
        let held = self
            .parent(id)
            .and_then(|parent| self.node(parent))
            .is_some_and(|parent| parent.static_children.contains(&id));
        if held {
            log::warn!("{id} is a template child of its parent; release the instance instead");
        }
        held
    }

    fn ask_ready_to_release(&mut self, id: WidgetId) -> bool {
        let Some(node) = self.node_mut(id) else {
            return true;
        };
        node.flags.releasing = true;
        match node.behaviour.as_mut() {
            Some(behaviour) => behaviour.try_to_release(),
            // checked out by its own refresh; try again next tick
            None => false,
        }
    }

    pub(crate) fn process_delayed_releases(&mut self) {
        let pending: Vec<WidgetId> = self.delayed_releases.iter().copied().collect();
        for id in pending {
            if !self.is_spawned(id) {
                self.delayed_releases.shift_remove(&id);
                continue;
            }
            if !self.ask_ready_to_release(id) {
                continue;
            }
            // the owner redeclares without this node
            if let Some(owner) = self.owner(id).filter(|owner| *owner != id) {
                self.mark_dirty(owner, false);
            }
            self.release_immediately(id);
        }
        if !self.delayed_releases.is_empty() {
            self.scheduler.schedule_frame();
        }
    }

    /// Releases the node now without consulting it: resets it, releases
    /// everything declared under it, then pools or destroys it.
    pub fn release_immediately(&mut self, id: WidgetId) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !node.is_spawned() {
            return;
        }
        let archetype = node.archetype;
        if self.refuse_template_child(id) {
            return;
        }
        self.delayed_releases.shift_remove(&id);

        self.reset_released(id);
        self.release_declared_children(id);

        let reusable = match archetype {
            Some(archetype) if archetype != id && self.contains(archetype) => archetype,
            _ => {
                log::trace!("{id} has no reusable archetype; destroying");
                self.destroy(id);
                return;
            }
        };

        self.deactivate(id);
        if let Some(host) = self.host(id) {
            self.scene.set_parent(host, None);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
            node.owner = None;
            node.depth = 0;
            node.children.clear();
        }

        let empty = self.hierarchy_is_empty(id);
        debug_assert!(empty, "{id} still has declared children when returned to the pool");
        let at_limit = self
            .config
            .pool_limit
            .is_some_and(|limit| self.pools.len_for(reusable) >= limit);
        if !empty || at_limit {
            self.destroy(id);
            return;
        }
        log::trace!("{id} returned to pool of {reusable}");
        self.pools.enqueue(reusable, id);
    }

    fn reset_released(&mut self, id: WidgetId) {
        let statics = match self.node_mut(id) {
            Some(node) => {
                if let Some(behaviour) = node.behaviour.as_mut() {
                    behaviour.reset_state();
                }
                node.flags.releasing = false;
                node.flags.released = true;
                node.flags.dirty = false;
                node.flags.has_refreshed = false;
                node.static_children.clone()
            }
            None => return,
        };
        for child in statics {
            self.delayed_releases.shift_remove(&child);
            self.reset_released(child);
        }
    }

    /// Force-releases the declared children of the node and of its template
    /// children, depth first.
    fn release_declared_children(&mut self, id: WidgetId) {
        let (statics, declared) = match self.node_mut(id) {
            Some(node) => {
                let mut declared = node.internal.take_all();
                declared.extend(node.owner_declared.take_all());
                node.internal.clear();
                node.owner_declared.clear();
                (node.static_children.clone(), declared)
            }
            None => return,
        };
        for child in statics {
            self.release_declared_children(child);
        }
        for record in declared {
            self.release_immediately(record.instance);
        }
    }

    fn deactivate(&mut self, id: WidgetId) {
        let (host, statics) = match self.node_mut(id) {
            Some(node) => {
                node.flags.active = false;
                (node.host, node.static_children.clone())
            }
            None => return,
        };
        self.scene.set_active(host, false);
        for child in statics {
            self.deactivate(child);
        }
    }

    fn hierarchy_is_empty(&self, id: WidgetId) -> bool {
        self.node(id).is_some_and(|node| {
            node.internal.is_empty()
                && node.owner_declared.is_empty()
                && node
                    .static_children
                    .iter()
                    .all(|child| self.hierarchy_is_empty(*child))
        })
    }

    /// Frees the node, its template children and anything still declared
    /// under them.
    pub(crate) fn destroy(&mut self, id: WidgetId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        self.delayed_releases.shift_remove(&id);
        let declared: Vec<_> = node
            .internal
            .records()
            .chain(node.owner_declared.records())
            .collect();
        for record in declared {
            self.destroy(record.instance);
        }
        for child in node.static_children.iter().copied() {
            self.forget_subtree(child);
        }
        self.scene.destroy_node(node.host);
        log::trace!("{id} destroyed");
    }

    /// Frees arena slots of a subtree whose host nodes go away with an
    /// ancestor's.
    fn forget_subtree(&mut self, id: WidgetId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        self.delayed_releases.shift_remove(&id);
        let declared: Vec<_> = node
            .internal
            .records()
            .chain(node.owner_declared.records())
            .collect();
        for record in declared {
            self.destroy(record.instance);
        }
        for child in node.static_children {
            self.forget_subtree(child);
        }
    }
}
