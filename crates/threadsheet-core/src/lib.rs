#![forbid(unsafe_code)]

//! Core: animation primitives, drag recognizers, and the sheet controller.

pub mod animation;
pub mod gesture;
pub mod logging;
pub mod sheet;

pub use gesture::{DragTracker, Recognizer};
pub use sheet::{AnimatedOffset, SheetEvent, SheetGestureController, SheetMetrics, SheetPosture};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};
