//! Testing utilities and harness for the widget tree

pub mod testing;
pub mod widgets;

// Re-export testing utilities
pub use testing::*;
pub use widgets::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use crate::widgets::*;
}
