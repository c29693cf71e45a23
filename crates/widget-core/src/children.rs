//! Per-parent bookkeeping for declared children.
//!
//! A [`ChildCollection`] holds one [`ReconciliationGroup`] per context key.
//! Inside a group, children are matched positionally against the previous
//! session; across groups, the final order is recovered in `End` by merging
//! on each child's sorting.

use crate::collections::OrderedMap;
use crate::node::ChildRecord;
use crate::ContextKey;

#[derive(Debug, Default, Clone)]
pub(crate) struct ReconciliationGroup {
    pub entries: Vec<ChildRecord>,
    /// Entries before this index were reclaimed in the current session.
    pub touched: usize,
}

impl ReconciliationGroup {
    pub fn candidate(&self) -> Option<ChildRecord> {
        self.entries.get(self.touched).copied()
    }

    /// Inserts a new entry at the touched position and claims it.
    pub fn insert_touched(&mut self, record: ChildRecord) {
        if self.touched == self.entries.len() {
            self.entries.push(record);
        } else {
            self.entries.insert(self.touched, record);
        }
        self.touched += 1;
    }

    /// Keeps an entry that is still releasing by swapping it into the touched
    /// region.
    pub fn retain_at(&mut self, index: usize) {
        self.entries.swap(index, self.touched);
        self.touched += 1;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ChildCollection {
    pub groups: OrderedMap<ContextKey, ReconciliationGroup>,
    /// Children of every group in sibling order, as of the last `End`.
    pub in_order: Vec<ChildRecord>,
    /// Cursor into `in_order`; `Some` while a session is open.
    pub editing_index: Option<usize>,
    pub order_changed: bool,
    pub default_group: i32,
}

impl ChildCollection {
    pub fn new(default_group: i32) -> Self {
        Self {
            groups: OrderedMap::default(),
            in_order: Vec::new(),
            editing_index: None,
            order_changed: false,
            default_group,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing_index.is_some()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets the touched counters. The caller positions the cursor.
    pub fn begin(&mut self) {
        for group in self.groups.values_mut() {
            group.touched = 0;
        }
        self.order_changed = false;
    }

    pub fn group_mut(&mut self, key: ContextKey) -> &mut ReconciliationGroup {
        self.groups.entry(key).or_default()
    }

    /// Drains every entry, for releasing a node's children wholesale.
    pub fn take_all(&mut self) -> Vec<ChildRecord> {
        let records = self
            .groups
            .drain(..)
            .flat_map(|(_, group)| group.entries)
            .collect();
        self.in_order.clear();
        self.editing_index = None;
        records
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.in_order.clear();
        self.editing_index = None;
        self.order_changed = false;
    }

    pub fn records(&self) -> impl Iterator<Item = ChildRecord> + '_ {
        self.groups.values().flat_map(|g| g.entries.iter().copied())
    }
}

/// Inserts `record` into `list` (sorted by `key`) after any equal keys.
///
/// Appends directly when `record` sorts last, which is the common case for a
/// collection that did not change order.
pub(crate) fn insert_sorted_by<K, F>(list: &mut Vec<ChildRecord>, record: ChildRecord, key: F) -> usize
where
    K: Ord,
    F: Fn(&ChildRecord) -> K,
{
    let record_key = key(&record);
    if list.last().map_or(true, |last| key(last) <= record_key) {
        list.push(record);
        return list.len() - 1;
    }
    let at = list.partition_point(|existing| key(existing) <= record_key);
    list.insert(at, record);
    at
}
