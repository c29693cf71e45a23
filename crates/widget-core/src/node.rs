use std::any::TypeId;

use crate::children::ChildCollection;
use crate::host::HostNode;
use crate::{ContextKey, Sorting, Widget, WidgetId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeFlags {
    pub dirty: bool,
    pub has_refreshed: bool,
    pub releasing: bool,
    pub released: bool,
    pub refreshing: bool,
    pub active: bool,
}

/// Which of a node's two child collections a session edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionKind {
    /// Children the node declares for itself.
    Internal,
    /// Children the node's owner declares into it from outside.
    Owner,
}

/// One declared child: the instance root placed under the parent and the
/// logical node handed back to the declaring code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildRecord {
    pub instance: WidgetId,
    pub widget: WidgetId,
}

impl ChildRecord {
    pub(crate) fn single(id: WidgetId) -> Self {
        Self {
            instance: id,
            widget: id,
        }
    }
}

pub(crate) struct WidgetNode {
    /// `None` only while the behaviour is running its own refresh.
    pub behaviour: Option<Box<dyn Widget>>,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub host: HostNode,
    pub parent: Option<WidgetId>,
    pub owner: Option<WidgetId>,
    pub archetype: Option<WidgetId>,
    pub depth: usize,
    pub sorting: Sorting,
    pub context: ContextKey,
    pub widget_index: usize,
    pub flags: NodeFlags,
    /// Template-declared children, in template order. Positions in this list
    /// are what backwalk paths record.
    pub static_children: Vec<WidgetId>,
    pub internal: ChildCollection,
    pub owner_declared: ChildCollection,
    /// Every child in sibling order: static, internal and owner-declared.
    pub children: Vec<ChildRecord>,
}

impl WidgetNode {
    pub fn new(
        behaviour: Box<dyn Widget>,
        type_id: TypeId,
        type_name: &'static str,
        host: HostNode,
    ) -> Self {
        Self {
            behaviour: Some(behaviour),
            type_id,
            type_name,
            host,
            parent: None,
            owner: None,
            archetype: None,
            depth: 0,
            sorting: Sorting::default(),
            context: ContextKey::none(),
            widget_index: 0,
            flags: NodeFlags::default(),
            static_children: Vec::new(),
            internal: ChildCollection::new(Sorting::INTERNAL_CHILDREN),
            owner_declared: ChildCollection::new(Sorting::OWNER_CHILDREN),
            children: Vec::new(),
        }
    }

    pub fn collection(&self, kind: CollectionKind) -> &ChildCollection {
        match kind {
            CollectionKind::Internal => &self.internal,
            CollectionKind::Owner => &self.owner_declared,
        }
    }

    pub fn collection_mut(&mut self, kind: CollectionKind) -> &mut ChildCollection {
        match kind {
            CollectionKind::Internal => &mut self.internal,
            CollectionKind::Owner => &mut self.owner_declared,
        }
    }

    pub fn is_spawned(&self) -> bool {
        self.flags.active && !self.flags.released
    }

    pub fn display_name(&self) -> &str {
        match &self.behaviour {
            Some(behaviour) => behaviour.name(),
            None => crate::widget::short_type_name(self.type_name),
        }
    }
}
