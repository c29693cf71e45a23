use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use crate::builder::Builder;
use crate::WidgetId;

/// Behaviour attached to a node of the widget tree.
///
/// `refresh` is the declaration callback: it runs whenever the node is dirty
/// and declares the node's children through the builder. Behaviours are
/// cloned when a template is instantiated and reused when an instance comes
/// back out of the pool, so `reset_state` must leave no trace of the previous
/// use.
pub trait Widget: WidgetAny + 'static {
    fn refresh(&mut self, builder: &mut Builder<'_>) {
        let _ = builder;
    }

    /// Asked every tick while a release is pending; return `false` to keep
    /// the node alive (for example until an exit transition finishes).
    fn try_to_release(&mut self) -> bool {
        true
    }

    /// Called when the node is released, before it is pooled or destroyed.
    fn reset_state(&mut self) {}

    fn name(&self) -> &str {
        short_type_name(type_name::<Self>())
    }
}

/// Object-safe helpers every [`Widget`] gets for free when it is `Clone`.
pub trait WidgetAny {
    fn clone_widget(&self) -> Box<dyn Widget>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Widget + Clone> WidgetAny for T {
    fn clone_widget(&self) -> Box<dyn Widget> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A widget whose declared state is set from outside by its owner.
///
/// Implementations should restore `State::default()` in
/// [`Widget::reset_state`].
pub trait StatefulWidget: Widget {
    type State: Clone + PartialEq + Default + 'static;

    fn state(&self) -> &Self::State;
    fn state_mut(&mut self) -> &mut Self::State;
}

pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// What to instantiate for a declared child.
///
/// * [`Template::of`]: the default archetype of `T`, built from `T::default()`.
/// * [`Template::root`]: a template root registered with
///   [`WidgetTree::create_archetype`](crate::WidgetTree::create_archetype).
/// * [`Template::nested`]: a node inside a template root. The whole root is
///   instantiated and the handle resolves to the matching node in the copy.
pub struct Template<T> {
    pub(crate) root: Option<WidgetId>,
    pub(crate) widget: Option<WidgetId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Template<T> {
    pub const fn of() -> Self {
        Self {
            root: None,
            widget: None,
            _marker: PhantomData,
        }
    }

    pub const fn root(id: WidgetId) -> Self {
        Self {
            root: None,
            widget: Some(id),
            _marker: PhantomData,
        }
    }

    pub const fn nested(root: WidgetId, widget: WidgetId) -> Self {
        Self {
            root: Some(root),
            widget: Some(widget),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Template<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Template<T> {}

impl<T> Default for Template<T> {
    fn default() -> Self {
        Self::of()
    }
}

impl<T> fmt::Debug for Template<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("type", &short_type_name(type_name::<T>()))
            .field("root", &self.root)
            .field("widget", &self.widget)
            .finish()
    }
}

/// Handle pair returned by a declaration: the instance root that was placed
/// under the parent, and the node of type `T` inside it (the same node unless
/// a nested template was declared).
pub struct WidgetChild<T> {
    pub instance: WidgetId,
    pub widget: WidgetId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WidgetChild<T> {
    pub(crate) fn new(instance: WidgetId, widget: WidgetId) -> Self {
        Self {
            instance,
            widget,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for WidgetChild<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WidgetChild<T> {}

impl<T> PartialEq for WidgetChild<T> {
    fn eq(&self, other: &Self) -> bool {
        self.instance == other.instance && self.widget == other.widget
    }
}

impl<T> Eq for WidgetChild<T> {}

impl<T> fmt::Debug for WidgetChild<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WidgetChild<{}>({} -> {})",
            short_type_name(type_name::<T>()),
            self.instance,
            self.widget
        )
    }
}
