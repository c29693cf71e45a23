//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`FrameScheduler`] for `widget-core`.
//! Applications construct a [`StdRuntime`], which owns a [`WidgetTree`]
//! wired to a [`StdScheduler`], and call [`StdRuntime::update`] from their
//! event loop whenever the registered frame waker fires.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use widget_core::{FrameScheduler, TreeConfig, WidgetTree};

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that delegates work to Rust's threading primitives.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    frame_waker: RwLock<Option<FrameWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        let mut slot = self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        let mut slot = self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl FrameScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard scheduler and the tree it
/// drives.
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    tree: WidgetTree,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self::from_tree(WidgetTree::with_config(config))
    }

    /// Takes over an already configured tree (custom scene or layout host)
    /// and routes its frame requests to the standard scheduler.
    pub fn from_tree(tree: WidgetTree) -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let tree = tree.with_scheduler(scheduler.clone());
        Self { scheduler, tree }
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut self.tree
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    /// Registers a waker to be called when the tree schedules a new frame.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    /// Clears any previously registered frame waker.
    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Ticks the tree if a frame was requested since the last update and
    /// there is work left. Returns whether it ticked.
    pub fn update(&mut self) -> bool {
        let requested = self.take_frame_request();
        if !requested || !self.tree.needs_tick() {
            return false;
        }
        self.tree.tick();
        true
    }

    /// Keeps ticking while frames are requested, at most `max_frames` times.
    /// Returns the number of ticks run.
    pub fn run_until_idle(&mut self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.update() {
            frames += 1;
        }
        if frames == max_frames && self.tree.needs_tick() {
            log::warn!("widget tree still busy after {frames} frames");
        }
        frames
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("frame", &self.tree.frame())
            .field("nodes", &self.tree.len())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
