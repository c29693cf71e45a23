//! The Begin / declare / End protocol over one of a node's child
//! collections.
//!
//! Begin resets every group's touched counter. Each declaration reclaims the
//! next untouched entry of its key's group when that entry is compatible,
//! otherwise acquires a new instance in its place. End releases whatever was
//! not reclaimed and rebuilds the sibling order.

use crate::children::insert_sorted_by;
use crate::collections::FastSet;
use crate::node::{ChildRecord, CollectionKind};
use crate::widget::{Template, WidgetChild};
use crate::{ContextKey, Sorting, Widget, WidgetId, WidgetTree};

impl WidgetTree {
    /// Opens a session on the collection `owner` edits on `parent`. Returns
    /// `None` when nothing may be declared there.
    pub(crate) fn begin_session(
        &mut self,
        parent: WidgetId,
        owner: WidgetId,
    ) -> Option<CollectionKind> {
        let kind = WidgetTree::collection_kind(parent, owner);
        let Some(node) = self.node(parent) else {
            log::warn!("declaring children into missing widget {parent}");
            return None;
        };
        if !node.is_spawned() {
            log::warn!("declaring children into {parent}, which is not live");
            return None;
        }
        if !self.is_descendant_or_self(parent, owner) {
            log::warn!("{owner} cannot declare children into {parent}: not one of its ancestors");
            return None;
        }
        if node.collection(kind).is_editing() {
            log::warn!(
                "children of {parent} opened twice for owner {owner}; closing the unfinished session first"
            );
            self.end_session(parent, owner, kind);
        }

        let node = self.node_mut(parent)?;
        node.collection_mut(kind).begin();
        self.drop_stale_entries(parent, owner, kind);
        let first = self.step_editing_index(parent, kind, None);
        if let Some(node) = self.node_mut(parent) {
            node.collection_mut(kind).editing_index = Some(first);
        }
        log::trace!("begin children of {parent} (owner {owner})");
        Some(kind)
    }

    /// Whether `id` is still the live child that `owner` declared into
    /// `parent`. Entries released outside of `End` (finished exits, explicit
    /// releases) may since have been pooled and handed to someone else.
    fn is_declared_here(&self, id: WidgetId, parent: WidgetId, owner: WidgetId) -> bool {
        self.node(id).is_some_and(|child| {
            child.is_spawned() && child.parent == Some(parent) && child.owner == Some(owner)
        })
    }

    fn drop_stale_entries(&mut self, parent: WidgetId, owner: WidgetId, kind: CollectionKind) {
        let Some(node) = self.node(parent) else {
            return;
        };
        let stale: FastSet<WidgetId> = node
            .collection(kind)
            .records()
            .map(|record| record.instance)
            .filter(|id| !self.is_declared_here(*id, parent, owner))
            .collect();
        if stale.is_empty() {
            return;
        }
        let Some(node) = self.node_mut(parent) else {
            return;
        };
        let collection = node.collection_mut(kind);
        for group in collection.groups.values_mut() {
            group.entries.retain(|record| !stale.contains(&record.instance));
        }
        collection.groups.retain(|_, group| !group.entries.is_empty());
        collection
            .in_order
            .retain(|record| !stale.contains(&record.instance));
        collection.order_changed = true;
        log::trace!("{parent}: dropped {} stale children", stale.len());
    }

    /// Next cursor position, skipping children that are no longer live or
    /// are on their way out.
    fn step_editing_index(&self, parent: WidgetId, kind: CollectionKind, from: Option<usize>) -> usize {
        let mut index = from.map_or(0, |i| i + 1);
        let Some(node) = self.node(parent) else {
            return index;
        };
        let in_order = &node.collection(kind).in_order;
        while let Some(record) = in_order.get(index) {
            let live = self
                .node(record.instance)
                .is_some_and(|child| child.is_spawned() && !child.flags.releasing);
            if live {
                break;
            }
            index += 1;
        }
        index
    }

    pub(crate) fn declare_child<T: Widget + Default>(
        &mut self,
        parent: WidgetId,
        owner: WidgetId,
        kind: CollectionKind,
        template: Template<T>,
        key: ContextKey,
        group: i32,
    ) -> Option<WidgetChild<T>> {
        let collection = self.node(parent)?.collection(kind);
        let Some(editing) = collection.editing_index else {
            log::warn!("declared a child of {parent} outside of a session");
            return None;
        };
        let existing = collection.groups.get(&key);
        let candidate = existing.and_then(|group| group.candidate());
        // released entries linger until End; only live ones block a unique key
        let occupied = existing.is_some_and(|group| {
            group
                .entries
                .iter()
                .any(|record| self.is_spawned(record.instance))
        });
        let sorting = Sorting::new(group, editing);

        let resolved = self.resolve_template(template, parent, owner);
        let reusable = candidate.filter(|record| self.can_reuse::<T>(*record, &resolved));

        let record = if let Some(record) = reusable {
            let previous = self.sorting(record.instance).unwrap_or_default();
            let reordered = previous != sorting;
            if let Some(child) = self.node_mut(record.instance) {
                child.sorting = sorting;
            }
            let collection = self.node_mut(parent)?.collection_mut(kind);
            collection.group_mut(key).touched += 1;
            if reordered {
                collection.order_changed = true;
                log::trace!("{parent}: reordered {} [{previous}] -> [{sorting}]", record.instance);
            } else {
                log::trace!("{parent}: kept {} [{sorting}]", record.instance);
            }
            record
        } else if key.is_unique() && occupied {
            // a releasing occupant marks the owner dirty once it is gone
            log::trace!("{parent}: refused a second child under {key:?}");
            return None;
        } else {
            let record = self.acquire::<T>(resolved, parent, owner, key, sorting)?;
            let collection = self.node_mut(parent)?.collection_mut(kind);
            collection.group_mut(key).insert_touched(record);
            collection.order_changed = true;
            log::trace!("{parent}: added {} [{sorting}]", record.instance);
            record
        };

        let next = self.step_editing_index(parent, kind, Some(editing));
        if let Some(node) = self.node_mut(parent) {
            node.collection_mut(kind).editing_index = Some(next);
        }
        Some(WidgetChild::new(record.instance, record.widget))
    }

    /// Closes the session: releases children that were not redeclared and
    /// rebuilds the sibling order.
    pub(crate) fn end_session(&mut self, parent: WidgetId, owner: WidgetId, kind: CollectionKind) {
        let Some(node) = self.node(parent) else {
            return;
        };
        let collection = node.collection(kind);
        if !collection.is_editing() {
            log::warn!("end of children of {parent} without a matching begin");
            return;
        }
        let keys: Vec<ContextKey> = collection.groups.keys().copied().collect();
        let claimed: FastSet<WidgetId> = collection
            .groups
            .values()
            .flat_map(|group| group.entries[..group.touched].iter())
            .map(|record| record.instance)
            .collect();

        let mut removed_any = false;
        for key in keys {
            let mut index = self.group_touched(parent, kind, key);
            while let Some(record) = self.group_entry(parent, kind, key, index) {
                index += 1;
                if !claimed.contains(&record.instance)
                    && self.is_declared_here(record.instance, parent, owner)
                {
                    self.release(record.instance);
                    if self.is_spawned(record.instance) && self.is_releasing(record.instance) {
                        if let Some(node) = self.node_mut(parent) {
                            if let Some(group) = node.collection_mut(kind).groups.get_mut(&key) {
                                group.retain_at(index - 1);
                            }
                        }
                        continue;
                    }
                }
                removed_any = true;
            }
            if let Some(node) = self.node_mut(parent) {
                if let Some(group) = node.collection_mut(kind).groups.get_mut(&key) {
                    let touched = group.touched;
                    group.entries.truncate(touched);
                }
            }
        }

        let records: Vec<ChildRecord> = match self.node_mut(parent) {
            Some(node) => {
                let collection = node.collection_mut(kind);
                collection.groups.retain(|_, group| !group.entries.is_empty());
                collection.records().collect()
            }
            None => return,
        };

        let mut in_order = Vec::with_capacity(records.len());
        for record in records {
            insert_sorted_by(&mut in_order, record, |r| {
                let child = self.node(r.instance);
                (
                    child.map(|c| c.sorting).unwrap_or_default(),
                    child.map_or(0, |c| c.widget_index),
                    r.instance,
                )
            });
        }
        for (index, record) in in_order.iter().enumerate() {
            if let Some(child) = self.node_mut(record.instance) {
                child.widget_index = index;
            }
        }

        let order_changed = match self.node_mut(parent) {
            Some(node) => {
                let collection = node.collection_mut(kind);
                collection.in_order = in_order;
                collection.editing_index = None;
                collection.order_changed |= removed_any;
                collection.order_changed
            }
            None => return,
        };
        log::trace!("end children of {parent} (owner {owner})");

        if order_changed {
            self.sort_children(parent);
            if kind == CollectionKind::Owner {
                if let Some(grandparent) = self.parent(parent) {
                    self.mark_dirty(grandparent, false);
                }
            }
        }
    }

    fn group_touched(&self, parent: WidgetId, kind: CollectionKind, key: ContextKey) -> usize {
        self.node(parent)
            .and_then(|node| node.collection(kind).groups.get(&key))
            .map_or(0, |group| group.touched)
    }

    fn group_entry(
        &self,
        parent: WidgetId,
        kind: CollectionKind,
        key: ContextKey,
        index: usize,
    ) -> Option<ChildRecord> {
        self.node(parent)?
            .collection(kind)
            .groups
            .get(&key)?
            .entries
            .get(index)
            .copied()
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
