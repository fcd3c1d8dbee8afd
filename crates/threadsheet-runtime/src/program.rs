#![forbid(unsafe_code)]

//! Elm-style update loop: models turn messages into state changes plus
//! [`Cmd`]s describing side effects.
//!
//! Side effects never run inside `update`. A [`Cmd::Task`] wraps a blocking
//! closure (typically a backend call) whose return value is fed back to the
//! model as a message. Who runs that closure, and when, is up to the host:
//! the [`crate::simulator::Simulator`] runs tasks inline or holds them for
//! manual release, and [`crate::executor::TaskExecutor`] runs them on worker
//! threads.

use std::fmt;

/// Diagnostics for a background task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name for logging.
    pub name: Option<String>,
}

impl TaskSpec {
    /// A named task.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// A side effect requested by [`Model::update`].
#[derive(Default)]
pub enum Cmd<M> {
    /// No operation.
    #[default]
    None,
    /// Execute commands in order.
    Batch(Vec<Cmd<M>>),
    /// Send a message straight back to the model.
    Msg(M),
    /// Run a blocking closure off the update loop; its result is delivered
    /// as a message.
    Task(TaskSpec, Box<dyn FnOnce() -> M + Send>),
}

impl<M: fmt::Debug> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Task(spec, _) => f.debug_struct("Task").field("spec", spec).finish(),
        }
    }
}

impl<M> Cmd<M> {
    /// Create a no-op command.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a message command.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    /// Create a batch, collapsing empty and single-element batches and
    /// dropping no-ops.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Create a named background task.
    pub fn task<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(TaskSpec::named(name), Box::new(f))
    }

    /// Whether this is [`Cmd::None`].
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Return a stable name for tracing.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Batch(_) => "Batch",
            Self::Msg(_) => "Msg",
            Self::Task(..) => "Task",
        }
    }

    /// Number of tasks this command will spawn, batches included.
    pub fn task_count(&self) -> usize {
        match self {
            Self::Task(..) => 1,
            Self::Batch(cmds) => cmds.iter().map(Self::task_count).sum(),
            Self::None | Self::Msg(_) => 0,
        }
    }
}

/// A state machine driven by messages.
pub trait Model {
    /// Messages the model understands, including task results.
    type Message: Send + 'static;

    /// Startup commands.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Apply one message.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;
}
