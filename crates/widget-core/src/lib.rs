#![doc = r"Retained-mode widget tree: keyed child reconciliation, template instancing with pooling, and a depth-ordered refresh scheduler."]

pub mod builder;
pub mod collections;
pub mod context;
pub mod event;
pub mod hash;
pub mod host;
pub mod platform;
pub mod sorting;
pub mod tree;
pub mod widget;

mod acquire;
mod children;
mod node;
mod pool;
mod reconcile;
mod release;
mod scheduler;

pub use builder::Builder;
pub use context::ContextKey;
pub use event::{Clicked, EventStorage, HasEvent, Hovered, WidgetEvent};
pub use host::{HostNode, LayoutHost, MemoryScene, NoopLayout, SceneHost};
pub use node::ChildRecord;
pub use platform::{DefaultScheduler, FrameScheduler};
pub use sorting::Sorting;
pub use tree::{TickPhase, TreeConfig, WidgetTree};
pub use widget::{StatefulWidget, Template, Widget, WidgetAny, WidgetChild};

pub type WidgetId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    Missing { id: WidgetId },
    TypeMismatch { id: WidgetId, expected: &'static str },
    Released { id: WidgetId },
    /// The node's behaviour is checked out by a refresh in progress.
    Busy { id: WidgetId },
    RefreshPanicked { id: WidgetId, message: String },
}

impl std::fmt::Display for WidgetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetError::Missing { id } => write!(f, "widget {id} missing"),
            WidgetError::TypeMismatch { id, expected } => {
                write!(f, "widget {id} type mismatch; expected {expected}")
            }
            WidgetError::Released { id } => write!(f, "widget {id} has been released"),
            WidgetError::Busy { id } => write!(f, "widget {id} is refreshing"),
            WidgetError::RefreshPanicked { id, message } => {
                write!(f, "widget {id} panicked during refresh: {message}")
            }
        }
    }
}

impl std::error::Error for WidgetError {}
