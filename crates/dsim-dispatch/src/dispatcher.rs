//! Scheduler actor sending tasks to workers.

use std::cell::RefCell;
use std::rc::Rc;

use dsim_core::{log_debug, log_info, SimulationContext};
use dsim_network::{Mailbox, Message};

use crate::config::{SendMode, TaskKind, SENTINEL};
use crate::policy::DispatchPolicy;

/// Scheduler which sends `tasks` tasks to worker mailboxes selected by the policy
/// and then one finish signal to every worker.
pub struct Dispatcher {
    ctx: SimulationContext,
    mailboxes: Vec<Rc<Mailbox>>,
    tasks: usize,
    task: TaskKind,
    message_size: f64,
    send_mode: SendMode,
    policy: Box<dyn DispatchPolicy>,
    assignments: Rc<RefCell<Vec<usize>>>,
}

impl Dispatcher {
    /// Creates a dispatcher for the given worker mailboxes.
    pub fn new(
        ctx: SimulationContext,
        mailboxes: Vec<Rc<Mailbox>>,
        tasks: usize,
        task: TaskKind,
        message_size: f64,
        send_mode: SendMode,
        policy: Box<dyn DispatchPolicy>,
    ) -> Self {
        Self {
            ctx,
            mailboxes,
            tasks,
            task,
            message_size,
            send_mode,
            policy,
            assignments: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns the worker indices of dispatched tasks, filled during the run.
    pub fn assignments(&self) -> Rc<RefCell<Vec<usize>>> {
        self.assignments.clone()
    }

    async fn send(&self, mailbox: &Mailbox, payload: f64) {
        let message = Message::new(payload, self.message_size);
        match self.send_mode {
            SendMode::Detached => mailbox.send(&self.ctx, message),
            SendMode::Synchronous => mailbox.put(&self.ctx, message).await,
        }
    }

    /// Dispatches all tasks and finish signals.
    pub async fn run(mut self) {
        log_debug!(
            self.ctx,
            "dispatching {} tasks to {} workers with {} policy",
            self.tasks,
            self.mailboxes.len(),
            self.policy.name()
        );
        for i in 0..self.tasks {
            let target = self.policy.select(i);
            let mailbox = self.mailboxes[target].clone();
            let payload = match self.task {
                TaskKind::Timestamp => self.ctx.time(),
                TaskKind::Work { size } => size,
            };
            log_info!(self.ctx, "Sending task to mailbox {}", mailbox.name());
            self.assignments.borrow_mut().push(target);
            self.send(&mailbox, payload).await;
        }
        for mailbox in self.mailboxes.iter() {
            log_info!(self.ctx, "Sending finish signal to mailbox {}", mailbox.name());
            self.send(mailbox, SENTINEL).await;
        }
    }
}
