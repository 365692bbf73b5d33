//! Worker actor executing received tasks.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dsim_compute::compute::{execute, Compute};
use dsim_core::{log_debug, log_info, SimulationContext};
use dsim_network::Mailbox;

use crate::config::{SentinelRule, TaskKind};

/// Statistics collected by a worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkerStats {
    /// Worker name.
    pub name: String,
    /// Number of received messages including the finish signal.
    pub received: usize,
    /// Number of executed tasks.
    pub tasks: usize,
    /// Number of received finish signals.
    pub sentinels: usize,
    /// Communication times measured in timestamp mode.
    pub latencies: Vec<f64>,
    /// Total time spent computing.
    pub compute_time: f64,
    /// Time when the worker finished.
    pub finish_time: f64,
}

/// Worker receiving tasks from its mailbox until the finish signal.
pub struct Worker {
    ctx: SimulationContext,
    mailbox: Rc<Mailbox>,
    compute: Rc<RefCell<Compute>>,
    host_speed: f64,
    task: TaskKind,
    sentinel: SentinelRule,
    stats: Rc<RefCell<WorkerStats>>,
}

impl Worker {
    /// Creates a worker computing on the given resource.
    ///
    /// In timestamp mode each task is `2 * host_speed` flops, where `host_speed` is the speed of the physical host
    /// even if `compute` is a VM sharing the host.
    pub fn new(
        ctx: SimulationContext,
        mailbox: Rc<Mailbox>,
        compute: Rc<RefCell<Compute>>,
        host_speed: f64,
        task: TaskKind,
        sentinel: SentinelRule,
    ) -> Self {
        let stats = Rc::new(RefCell::new(WorkerStats {
            name: ctx.name().to_string(),
            ..Default::default()
        }));
        Self {
            ctx,
            mailbox,
            compute,
            host_speed,
            task,
            sentinel,
            stats,
        }
    }

    /// Returns the worker statistics, filled during the run.
    pub fn stats(&self) -> Rc<RefCell<WorkerStats>> {
        self.stats.clone()
    }

    /// Processes tasks until the finish signal is received.
    pub async fn run(self) {
        loop {
            log_debug!(self.ctx, "Receiving from mailbox {}", self.mailbox.name());
            let message = self.mailbox.get(&self.ctx).await;
            self.stats.borrow_mut().received += 1;
            if self.sentinel.is_sentinel(message.payload) {
                log_debug!(self.ctx, "received finish signal");
                self.stats.borrow_mut().sentinels += 1;
                break;
            }
            let flops = match self.task {
                TaskKind::Timestamp => {
                    let communication_time = self.ctx.time() - message.payload;
                    log_info!(self.ctx, "Communication time (latency bound) {:.6}", communication_time);
                    self.stats.borrow_mut().latencies.push(communication_time);
                    2. * self.host_speed
                }
                TaskKind::Work { .. } => message.payload,
            };
            let start = self.ctx.time();
            execute(&self.compute, &self.ctx, flops).await;
            let mut stats = self.stats.borrow_mut();
            stats.tasks += 1;
            stats.compute_time += self.ctx.time() - start;
        }
        self.stats.borrow_mut().finish_time = self.ctx.time();
    }
}
