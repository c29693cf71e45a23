//! Platform abstraction for frame scheduling.
//!
//! The tree never ticks itself. Whenever it gains work (a node is marked
//! dirty, a release is deferred) it asks the host for another tick through
//! [`FrameScheduler`], so the host can stay idle while nothing changes.

/// Requests ticks from the host driving a [`WidgetTree`](crate::WidgetTree).
pub trait FrameScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}

/// Scheduler that ignores frame requests; for hosts that tick unconditionally.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl FrameScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}
