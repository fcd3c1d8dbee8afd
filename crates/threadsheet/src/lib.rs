#![forbid(unsafe_code)]

//! Threadsheet public facade crate.
//!
//! Re-exports the comment engine, the sheet controller, and (with the
//! default `runtime` feature) the overlay runtime, plus a prelude for
//! day-to-day use.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use threadsheet_core::{
    AnimatedOffset, Recognizer, SheetEvent, SheetGestureController, SheetMetrics, SheetPosture,
};

// --- Comment re-exports ----------------------------------------------------

pub use threadsheet_comments::{
    Author, BackendError, Comment, CommentBackend, CommentId, CommentRow, CommentThread,
    ContentKind, CountChange, MutationController, RenderContext, RepliesAffordance, Row, Skip,
    Target, TimeStyle,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use threadsheet_runtime::{
    Cmd, CommentOverlay, ConfigError, Model, Msg, OverlayConfig, OverlayEvent, OverlaySimulator,
    TaskExecutor,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for threadsheet hosts.
#[derive(Debug)]
pub enum Error {
    /// The overlay configuration was rejected.
    #[cfg(feature = "runtime")]
    Config(ConfigError),
    /// A backend call failed.
    Backend(BackendError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
            Self::Backend(err) => Some(err),
        }
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

/// Standard result type for threadsheet APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Fetch a thread's root comments once, outside any overlay.
///
/// Unlike an open overlay, which degrades a failed root fetch to the empty
/// state, this surfaces the backend error.
pub fn fetch_thread(backend: &dyn CommentBackend, target: Target) -> Result<CommentThread> {
    let roots = backend.fetch_roots(&target)?;
    let mut thread = CommentThread::new(target);
    thread.apply_roots(Ok(roots));
    Ok(thread)
}

/// Load an overlay config from optional JSON, then apply `THREADSHEET_*`
/// environment overrides.
#[cfg(feature = "runtime")]
pub fn load_config(json: Option<&str>) -> Result<OverlayConfig> {
    let config = match json {
        Some(json) => OverlayConfig::from_json_str(json)?,
        None => OverlayConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Comment, CommentBackend, CommentId, CommentThread, ContentKind, Error, Result, Row,
        SheetPosture, Target, fetch_thread,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{Cmd, CommentOverlay, Model, Msg, OverlayConfig, OverlayEvent};

    pub use crate::{comments, core};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use threadsheet_comments as comments;
pub use threadsheet_core as core;
#[cfg(feature = "runtime")]
pub use threadsheet_runtime as runtime;
