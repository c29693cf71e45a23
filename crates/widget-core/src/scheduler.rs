//! Depth-ordered refresh scheduling.
//!
//! Dirty nodes are queued by depth. A tick first finishes pending releases,
//! then sweeps the queues from the root downwards and back up again, for at
//! most [`TreeConfig::max_refresh_passes`](crate::TreeConfig) passes. Work
//! left over after the last pass is carried into the next tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::builder::Builder;
use crate::tree::TickPhase;
use crate::{ContextKey, Sorting, WidgetError, WidgetId, WidgetTree};

/// Per-depth dirty lists, double-buffered between this tick and the next.
#[derive(Debug, Default)]
pub(crate) struct DirtyQueues {
    current: Vec<Vec<WidgetId>>,
    next: Vec<Vec<WidgetId>>,
    /// Depth being swept, `None` outside a refresh pass.
    refresh_depth: Option<usize>,
}

impl DirtyQueues {
    /// Queues `id` for this pass when its depth has not been swept yet (or
    /// `force` is set), otherwise for the next tick.
    pub fn push(&mut self, id: WidgetId, depth: usize, force: bool) {
        let this_pass = force || self.refresh_depth.map_or(true, |current| current < depth);
        let lists = if this_pass {
            &mut self.current
        } else {
            &mut self.next
        };
        push_at(lists, id, depth);
    }

    pub fn push_next(&mut self, id: WidgetId, depth: usize) {
        push_at(&mut self.next, id, depth);
    }

    pub fn current_is_empty(&self) -> bool {
        self.current.iter().all(Vec::is_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.current_is_empty() && self.next.iter().all(Vec::is_empty)
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

fn push_at(lists: &mut Vec<Vec<WidgetId>>, id: WidgetId, depth: usize) {
    if lists.len() <= depth {
        lists.resize_with(depth + 1, Vec::new);
    }
    lists[depth].push(id);
}

impl WidgetTree {
    /// Flags the node for refresh and asks the host for a frame. Returns
    /// `false` if the node was already dirty or is not live.
    ///
    /// With `force` the node is refreshed in the current pass even when its
    /// depth has already been swept.
    pub fn mark_dirty(&mut self, id: WidgetId, force: bool) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.flags.dirty || !node.is_spawned() {
            return false;
        }
        node.flags.dirty = true;
        let depth = node.depth;
        self.queues.push(id, depth, force);
        log::trace!("{id} marked dirty at depth {depth}");
        self.scheduler.schedule_frame();
        true
    }

    /// Whether another tick would do anything.
    pub fn needs_tick(&self) -> bool {
        !self.queues.is_empty() || !self.delayed_releases.is_empty()
    }

    /// Runs one frame: pending releases, then the refresh passes.
    pub fn tick(&mut self) {
        if self.phase != TickPhase::Idle {
            log::warn!("tick requested during {:?}; ignoring", self.phase);
            return;
        }
        self.phase = TickPhase::Releasing;
        self.process_delayed_releases();
        self.phase = TickPhase::Refreshing;
        self.refresh_dirty();
        self.phase = TickPhase::Idle;
        self.frame += 1;
    }

    fn refresh_dirty(&mut self) {
        let max_passes = self.config.max_refresh_passes.max(1);
        for pass in 0..max_passes {
            let mut depth = 0;
            while depth < self.queues.current.len() {
                self.queues.refresh_depth = Some(depth);
                self.refresh_queue(depth);
                depth += 1;
            }

            // nodes forced dirty at depths already swept
            self.queues.refresh_depth = Some(depth);
            for shallower in (0..depth).rev() {
                if !self.queues.current[shallower].is_empty() {
                    self.refresh_queue(shallower);
                }
            }

            if self.queues.current_is_empty() {
                break;
            }
            log::trace!("refresh pass {pass} left work behind");
        }

        let leftover = std::mem::take(&mut self.queues.current);
        for (depth, list) in leftover.into_iter().enumerate() {
            for id in list {
                if !self.is_spawned(id) || !self.is_dirty(id) {
                    continue;
                }
                log::warn!(
                    "{} ({id}) still dirty at end of refresh; deferring to next frame",
                    self.name(id).unwrap_or("?")
                );
                self.queues.push_next(id, depth);
            }
        }

        self.queues.refresh_depth = None;
        self.queues.swap();
        if !self.queues.current_is_empty() {
            self.scheduler.schedule_frame();
        }
    }

    fn refresh_queue(&mut self, depth: usize) {
        let mut index = 0;
        // refreshing may append to this very list
        while let Some(id) = self.queues.current[depth].get(index).copied() {
            index += 1;
            self.refresh_queued(id);
        }
        self.queues.current[depth].clear();
    }

    fn refresh_queued(&mut self, id: WidgetId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if node.flags.released || !node.flags.dirty {
            return;
        }
        if !node.flags.active {
            node.flags.dirty = false;
            return;
        }

        if let Err(err) = self.refresh(id) {
            log::error!("{err}");
            if let Some(node) = self.node_mut(id) {
                if !node.flags.released && !node.flags.dirty {
                    node.flags.dirty = true;
                    let depth = node.depth;
                    self.queues.push_next(id, depth);
                    self.scheduler.schedule_frame();
                }
            }
        }
    }

    /// Runs the node's declaration callback now.
    ///
    /// A panic in the callback is caught and returned as
    /// [`WidgetError::RefreshPanicked`]; the declaration session is still
    /// closed. Refreshing a node from inside its own callback is ignored.
    pub fn refresh(&mut self, id: WidgetId) -> Result<(), WidgetError> {
        let node = self.node_mut(id).ok_or(WidgetError::Missing { id })?;
        if node.flags.released {
            return Err(WidgetError::Released { id });
        }
        if node.flags.refreshing {
            log::warn!("{id} refreshed from inside its own refresh; ignoring");
            return Ok(());
        }
        if !node.flags.active {
            node.flags.dirty = false;
            return Ok(());
        }
        let needs_init = !node.flags.has_refreshed && node.archetype.is_none();
        if needs_init {
            self.init(id, None, None, id, ContextKey::none(), Sorting::default());
        }

        let node = self.node_mut(id).ok_or(WidgetError::Missing { id })?;
        let mut behaviour = node.behaviour.take().ok_or(WidgetError::Busy { id })?;
        node.flags.dirty = false;
        node.flags.refreshing = true;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut builder = Builder::open(&mut *self, id, id);
            behaviour.refresh(&mut builder);
        }));

        let Some(node) = self.node_mut(id) else {
            return Err(WidgetError::Missing { id });
        };
        node.behaviour = Some(behaviour);
        node.flags.refreshing = false;
        match outcome {
            Ok(()) => {
                node.flags.has_refreshed = true;
                log::trace!("{} ({id}) refreshed", node.display_name());
                Ok(())
            }
            Err(payload) => Err(WidgetError::RefreshPanicked {
                id,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
