use crate::node::CollectionKind;
use crate::widget::{Template, WidgetChild};
use crate::{ContextKey, StatefulWidget, Widget, WidgetId, WidgetTree};

/// Scope over one declaration session.
///
/// Creating a builder begins the session on the parent's collection and
/// dropping it ends the session, on every exit path including unwinding.
/// Children that were declared in the previous session but not in this one
/// are released when the builder goes away.
pub struct Builder<'a> {
    tree: &'a mut WidgetTree,
    parent: WidgetId,
    owner: WidgetId,
    kind: Option<CollectionKind>,
}

impl<'a> Builder<'a> {
    pub(crate) fn open(tree: &'a mut WidgetTree, parent: WidgetId, owner: WidgetId) -> Self {
        let kind = tree.begin_session(parent, owner);
        Self {
            tree,
            parent,
            owner,
            kind,
        }
    }

    pub fn parent(&self) -> WidgetId {
        self.parent
    }

    pub fn owner(&self) -> WidgetId {
        self.owner
    }

    /// `false` when the session could not be opened; declarations then
    /// return `None`.
    pub fn is_open(&self) -> bool {
        self.kind.is_some()
    }

    /// Declares a child in this session's default sorting group.
    pub fn declare<T: Widget + Default>(
        &mut self,
        template: Template<T>,
        key: ContextKey,
    ) -> Option<WidgetChild<T>> {
        let kind = self.kind?;
        let group = self.tree.node(self.parent)?.collection(kind).default_group;
        self.declare_in_group(template, key, group)
    }

    pub fn declare_in_group<T: Widget + Default>(
        &mut self,
        template: Template<T>,
        key: ContextKey,
        group: i32,
    ) -> Option<WidgetChild<T>> {
        let kind = self.kind?;
        self.tree
            .declare_child(self.parent, self.owner, kind, template, key, group)
    }

    /// Declares a child built from the default archetype of `T`.
    pub fn widget<T: Widget + Default>(&mut self, key: ContextKey) -> Option<WidgetChild<T>> {
        self.declare(Template::of(), key)
    }

    /// Opens a nested session declaring children into `child` on behalf of
    /// this builder's owner.
    pub fn children<T>(&mut self, child: &WidgetChild<T>) -> Builder<'_> {
        Builder::open(&mut *self.tree, child.widget, self.owner)
    }

    pub fn with_children<T, R>(
        &mut self,
        child: &WidgetChild<T>,
        f: impl FnOnce(&mut Builder<'_>) -> R,
    ) -> R {
        let mut nested = self.children(child);
        f(&mut nested)
    }

    /// Applies state to a declared child; returns whether it was marked dirty.
    pub fn set_state<W: StatefulWidget>(&mut self, child: &WidgetChild<W>, state: W::State) -> bool {
        match self.tree.set_state::<W>(child.widget, state, false) {
            Ok(dirty) => dirty,
            Err(err) => {
                log::warn!("could not set state: {err}");
                false
            }
        }
    }

    pub fn tree(&self) -> &WidgetTree {
        &*self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut *self.tree
    }

    /// Ends the session now rather than at the end of the scope.
    pub fn end(self) {}

    fn finish(&mut self) {
        if let Some(kind) = self.kind.take() {
            self.tree.end_session(self.parent, self.owner, kind);
        }
    }
}

impl Drop for Builder<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
