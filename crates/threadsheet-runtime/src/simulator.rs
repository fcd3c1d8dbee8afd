#![forbid(unsafe_code)]

//! Deterministic driver for [`Model`]s.
//!
//! `Simulator` runs a model without threads or a real clock. Tasks either
//! run inline as soon as they are issued ([`TaskMode::Inline`]) or queue up
//! until the test releases them ([`TaskMode::Deferred`]), which makes it
//! possible to observe the model while requests are still in flight.
//!
//! # Example
//!
//! ```ignore
//! let mut sim = OverlaySimulator::deferred(overlay);
//! sim.send(Msg::Open);
//! assert_eq!(sim.pending_tasks(), 2);
//! sim.run_pending();
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::overlay::{CommentOverlay, Msg};
use crate::program::{Cmd, Model, TaskSpec};

/// When tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Run each task as soon as it is issued.
    Inline,
    /// Queue tasks until [`Simulator::run_next`] or
    /// [`Simulator::run_pending`].
    Deferred,
}

/// Record of a command that was executed during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdRecord {
    None,
    /// Message sent to the model.
    Msg,
    /// Batch of `n` commands.
    Batch(usize),
    /// A task was issued.
    Task(Option<String>),
    /// A task ran and its message was delivered.
    TaskRan(Option<String>),
}

type Job<M> = (TaskSpec, Box<dyn FnOnce() -> M + Send>);

/// Deterministic simulator for [`Model`] testing.
pub struct Simulator<M: Model> {
    model: M,
    mode: TaskMode,
    pending: VecDeque<Job<M::Message>>,
    command_log: Vec<CmdRecord>,
}

/// Simulator for a comment overlay.
pub type OverlaySimulator = Simulator<CommentOverlay>;

impl<M: Model> Simulator<M> {
    /// Wrap a model. Call [`init`](Self::init) to run its startup commands.
    pub fn new(model: M, mode: TaskMode) -> Self {
        Self {
            model,
            mode,
            pending: VecDeque::new(),
            command_log: Vec::new(),
        }
    }

    /// Simulator running tasks inline.
    pub fn inline(model: M) -> Self {
        Self::new(model, TaskMode::Inline)
    }

    /// Simulator holding tasks until released.
    pub fn deferred(model: M) -> Self {
        Self::new(model, TaskMode::Deferred)
    }

    /// Run the model's startup commands.
    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute_cmd(cmd);
    }

    /// Deliver one message.
    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.execute_cmd(cmd);
    }

    /// Deliver several messages in order.
    pub fn send_all(&mut self, msgs: impl IntoIterator<Item = M::Message>) {
        for msg in msgs {
            self.send(msg);
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    /// Switch modes; already queued tasks stay queued.
    pub fn set_mode(&mut self, mode: TaskMode) {
        self.mode = mode;
    }

    /// Number of queued tasks.
    pub fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    /// Names of queued tasks, oldest first.
    pub fn pending_names(&self) -> Vec<Option<String>> {
        self.pending.iter().map(|(spec, _)| spec.name.clone()).collect()
    }

    /// Run the oldest queued task. Returns `false` if none was queued.
    pub fn run_next(&mut self) -> bool {
        let Some((spec, job)) = self.pending.pop_front() else {
            return false;
        };
        self.run_job(spec, job);
        true
    }

    /// Run the newest queued task, simulating out-of-order completion.
    pub fn run_last(&mut self) -> bool {
        let Some((spec, job)) = self.pending.pop_back() else {
            return false;
        };
        self.run_job(spec, job);
        true
    }

    /// Run queued tasks until none remain, including tasks they issue.
    pub fn run_pending(&mut self) {
        while self.run_next() {}
    }

    /// Drop every queued task without running it.
    pub fn discard_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// All commands executed so far.
    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    /// Consume the simulator and return the model.
    pub fn into_model(self) -> M {
        self.model
    }

    fn run_job(&mut self, spec: TaskSpec, job: Box<dyn FnOnce() -> M::Message + Send>) {
        self.command_log.push(CmdRecord::TaskRan(spec.name));
        let msg = job();
        let cmd = self.model.update(msg);
        self.execute_cmd(cmd);
    }

    /// Execute a command against the model.
    pub fn execute_cmd(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {
                self.command_log.push(CmdRecord::None);
            }
            Cmd::Msg(m) => {
                self.command_log.push(CmdRecord::Msg);
                let cmd = self.model.update(m);
                self.execute_cmd(cmd);
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for c in cmds {
                    self.execute_cmd(c);
                }
            }
            Cmd::Task(spec, job) => {
                self.command_log.push(CmdRecord::Task(spec.name.clone()));
                match self.mode {
                    TaskMode::Inline => self.run_job(spec, job),
                    TaskMode::Deferred => self.pending.push_back((spec, job)),
                }
            }
        }
    }
}

impl OverlaySimulator {
    /// Tick the overlay `frames` times at its configured frame interval.
    pub fn advance_frames(&mut self, frames: usize) {
        let dt = self.model.config().frame_interval();
        for _ in 0..frames {
            self.send(Msg::Tick(dt));
        }
    }

    /// Tick until the sheet stops moving, up to `limit` of simulated time.
    /// Returns the simulated time spent.
    pub fn settle(&mut self, limit: Duration) -> Duration {
        let dt = self.model.config().frame_interval();
        let mut elapsed = Duration::ZERO;
        while self.model.sheet().is_animating() && elapsed < limit {
            self.send(Msg::Tick(dt));
            elapsed += dt;
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: i32,
        log: Vec<&'static str>,
    }

    #[derive(Debug)]
    enum CounterMsg {
        Fetch(&'static str, i32),
        Fetched(&'static str, i32),
        Both,
    }

    impl Model for Counter {
        type Message = CounterMsg;

        fn init(&mut self) -> Cmd<CounterMsg> {
            Cmd::msg(CounterMsg::Fetch("init", 1))
        }

        fn update(&mut self, msg: CounterMsg) -> Cmd<CounterMsg> {
            match msg {
                CounterMsg::Fetch(name, n) => {
                    Cmd::task(name, move || CounterMsg::Fetched(name, n))
                }
                CounterMsg::Fetched(name, n) => {
                    self.value += n;
                    self.log.push(name);
                    Cmd::none()
                }
                CounterMsg::Both => Cmd::batch(vec![
                    Cmd::msg(CounterMsg::Fetch("a", 10)),
                    Cmd::msg(CounterMsg::Fetch("b", 100)),
                ]),
            }
        }
    }

    #[test]
    fn inline_runs_tasks_immediately() {
        let mut sim = Simulator::inline(Counter::default());
        sim.init();
        assert_eq!(sim.model().value, 1);
        assert_eq!(sim.pending_tasks(), 0);
        assert!(sim
            .command_log()
            .contains(&CmdRecord::TaskRan(Some("init".into()))));
    }

    #[test]
    fn deferred_holds_tasks_until_released() {
        let mut sim = Simulator::deferred(Counter::default());
        sim.send(CounterMsg::Both);
        assert_eq!(sim.model().value, 0);
        assert_eq!(sim.pending_names(), vec![Some("a".into()), Some("b".into())]);

        assert!(sim.run_last());
        assert_eq!(sim.model().log, vec!["b"]);
        sim.run_pending();
        assert_eq!(sim.model().value, 110);
        assert!(!sim.run_next());
    }

    #[test]
    fn discarded_tasks_never_deliver() {
        let mut sim = Simulator::deferred(Counter::default());
        sim.send(CounterMsg::Fetch("x", 5));
        assert_eq!(sim.discard_pending(), 1);
        sim.run_pending();
        assert_eq!(sim.model().value, 0);
    }
}
