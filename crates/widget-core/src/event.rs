//! Events raised on widgets by the host (input, hover) and read back by the
//! widget's owner on its next refresh.
//!
//! A widget opts into an event kind by implementing [`HasEvent`] for it.
//! Raising an event wakes the owner for the current frame, so the owner can
//! react in the same tick.

use crate::{Widget, WidgetError, WidgetId, WidgetTree};

pub trait WidgetEvent: Clone + 'static {
    /// Whether the stored event still applies during `frame`.
    fn is_valid(&self, frame: u64) -> bool;
}

/// Storage slot for one event kind on one widget.
#[derive(Debug, Clone)]
pub struct EventStorage<E> {
    value: Option<E>,
}

impl<E> Default for EventStorage<E> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<E: WidgetEvent> EventStorage<E> {
    pub fn set(&mut self, event: E) {
        self.value = Some(event);
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn get(&self, frame: u64) -> Option<E> {
        self.value.as_ref().filter(|e| e.is_valid(frame)).cloned()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

pub trait HasEvent<E: WidgetEvent>: Widget {
    fn events(&self) -> &EventStorage<E>;
    fn events_mut(&mut self) -> &mut EventStorage<E>;
}

/// Raised when a widget is clicked; valid only for the frame it was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clicked {
    pub frame: u64,
}

impl Clicked {
    pub fn this_frame(tree: &WidgetTree) -> Self {
        Self {
            frame: tree.frame(),
        }
    }
}

impl WidgetEvent for Clicked {
    fn is_valid(&self, frame: u64) -> bool {
        self.frame == frame
    }
}

/// Pointer hover state; valid while the pointer is over the widget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hovered {
    pub hovered: bool,
    pub position: (f32, f32),
}

impl WidgetEvent for Hovered {
    fn is_valid(&self, _frame: u64) -> bool {
        self.hovered
    }
}

impl WidgetTree {
    /// Stores `event` on the widget and wakes its owner for this frame.
    pub fn set_event<W, E>(&mut self, id: WidgetId, event: E) -> Result<(), WidgetError>
    where
        W: HasEvent<E>,
        E: WidgetEvent,
    {
        self.with_widget_mut::<W, _>(id, |widget| widget.events_mut().set(event))?;
        log::trace!("{} raised {}", id, std::any::type_name::<E>());
        if let Some(owner) = self.owner(id).filter(|owner| *owner != id) {
            self.mark_dirty(owner, true);
        }
        Ok(())
    }

    /// Reads the event if one is stored and still valid this frame.
    pub fn event<W, E>(&self, id: WidgetId) -> Option<E>
    where
        W: HasEvent<E>,
        E: WidgetEvent,
    {
        let frame = self.frame();
        self.with_widget::<W, _>(id, |widget| widget.events().get(frame))
            .ok()
            .flatten()
    }

    pub fn has_event<W, E>(&self, id: WidgetId) -> bool
    where
        W: HasEvent<E>,
        E: WidgetEvent,
    {
        self.event::<W, E>(id).is_some()
    }

    /// Clears the stored event and schedules the owner to refresh.
    pub fn clear_event<W, E>(&mut self, id: WidgetId) -> Result<(), WidgetError>
    where
        W: HasEvent<E>,
        E: WidgetEvent,
    {
        self.with_widget_mut::<W, _>(id, |widget| widget.events_mut().clear())?;
        if let Some(owner) = self.owner(id) {
            self.mark_dirty(owner, false);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/event_tests.rs"]
mod tests;
