#![forbid(unsafe_code)]

//! Runtime for threadsheet overlays.
//!
//! [`CommentOverlay`] is an Elm-style [`Model`]: it turns [`Msg`]s into
//! state changes plus [`Cmd`]s, and every backend call is a [`Cmd::Task`].
//! Drive it with the deterministic [`Simulator`] in tests or the threaded
//! [`TaskExecutor`] in a host.

pub mod config;
pub mod executor;
pub mod overlay;
pub mod program;
pub mod simulator;

pub use config::{ConfigError, OverlayConfig, SheetMetricsConfig, SpringTuning};
pub use executor::TaskExecutor;
pub use overlay::{Clock, CommentOverlay, Msg, OverlayEvent, system_clock};
pub use program::{Cmd, Model, TaskSpec};
pub use simulator::{CmdRecord, OverlaySimulator, Simulator, TaskMode};
