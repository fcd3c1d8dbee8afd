#![forbid(unsafe_code)]

//! Threaded host for a [`Model`].
//!
//! Each [`Cmd::Task`] runs on its own thread and sends its message back
//! over a channel. Results are applied only when the host calls
//! [`TaskExecutor::process_results`] (or one of the waiting helpers), so the
//! model itself is only ever touched from the host's thread.
//!
//! Dropping the executor detaches any threads still running; their results
//! are discarded.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::program::{Cmd, Model};

/// Runs a model's tasks on worker threads.
pub struct TaskExecutor<M: Model> {
    model: M,
    task_sender: mpsc::Sender<M::Message>,
    task_receiver: mpsc::Receiver<M::Message>,
    task_handles: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl<M: Model> TaskExecutor<M> {
    pub fn new(model: M) -> Self {
        let (task_sender, task_receiver) = mpsc::channel();
        Self {
            model,
            task_sender,
            task_receiver,
            task_handles: Vec::new(),
            in_flight: 0,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Tasks spawned whose messages have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
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

    /// Apply every task result that has already arrived. Returns how many
    /// were applied.
    pub fn process_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.task_receiver.try_recv() {
            self.apply_result(msg);
            applied += 1;
        }
        self.reap_finished_tasks();
        applied
    }

    /// Block until one task result arrives or `timeout` passes. Returns
    /// whether a result was applied.
    pub fn wait_one(&mut self, timeout: Duration) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.task_receiver.recv_timeout(timeout) {
            Ok(msg) => {
                self.apply_result(msg);
                self.reap_finished_tasks();
                true
            }
            Err(_) => false,
        }
    }

    /// Apply results until no task is in flight or `timeout` passes.
    /// Returns whether everything finished.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_one(remaining) {
                break;
            }
        }
        self.in_flight == 0
    }

    fn apply_result(&mut self, msg: M::Message) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let cmd = self.model.update(msg);
        self.execute_cmd(cmd);
    }

    fn execute_cmd(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Msg(m) => self.send(m),
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute_cmd(c);
                }
            }
            Cmd::Task(spec, f) => {
                tracing::trace!(task = spec.name.as_deref().unwrap_or("anonymous"), "spawning task");
                let sender = self.task_sender.clone();
                let handle = std::thread::spawn(move || {
                    let msg = f();
                    let _ = sender.send(msg);
                });
                self.task_handles.push(handle);
                self.in_flight += 1;
            }
        }
    }

    fn reap_finished_tasks(&mut self) {
        if self.task_handles.is_empty() {
            return;
        }
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.task_handles)
            .into_iter()
            .partition(JoinHandle::is_finished);
        self.task_handles = running;
        for handle in finished {
            if handle.join().is_err() {
                tracing::warn!("background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sum(u32);

    impl Model for Sum {
        type Message = u32;

        fn update(&mut self, n: u32) -> Cmd<u32> {
            if n >= 100 {
                self.0 += n;
                Cmd::none()
            } else {
                Cmd::task("scale", move || n * 100)
            }
        }
    }

    #[test]
    fn results_apply_only_when_processed() {
        let mut exec = TaskExecutor::new(Sum(0));
        exec.send(1);
        exec.send(2);
        assert_eq!(exec.in_flight(), 2);
        assert!(exec.wait_idle(Duration::from_secs(5)));
        assert_eq!(exec.model().0, 300);
        assert_eq!(exec.process_results(), 0);
    }

    #[test]
    fn wait_one_without_tasks_returns_immediately() {
        let mut exec = TaskExecutor::new(Sum(0));
        assert!(!exec.wait_one(Duration::from_secs(5)));
    }
}
