//! Simulation of a dispatching run.

use std::time::Instant;

use log::info;
use serde::Serialize;

use dsim_core::Simulation;
use dsim_network::Mailboxes;

use crate::config::{Placement, RunConfig};
use crate::dispatcher::Dispatcher;
use crate::error::RunError;
use crate::platform::{Platform, PlatformConfig};
use crate::policy::make_policy;
use crate::worker::{Worker, WorkerStats};

/// Name of the scheduler component.
pub const SCHEDULER_NAME: &str = "scheduler";

/// Results of a dispatching run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Simulation time when the last actor finished.
    pub simulated_time: f64,
    /// Wall-clock duration of the simulation in seconds.
    pub wall_time: f64,
    /// Statistics of workers in their order.
    pub workers: Vec<WorkerStats>,
    /// Worker index of each dispatched task.
    pub assignments: Vec<usize>,
    /// Number of simulation events.
    pub events: u64,
}

/// Returns the name of the mailbox of worker `i` (counting from 1).
pub fn mailbox_name(i: usize) -> String {
    format!("MAILBOX_W{}", i)
}

/// Returns the name of worker `i` (counting from 1).
pub fn worker_name(i: usize) -> String {
    format!("worker_{}", i)
}

/// Simulates the dispatching run on the platform.
///
/// The platform description and configuration are validated before any simulation component is created.
/// Workers are started before the scheduler, so at time zero all of them wait on their mailboxes.
pub fn run(platform_config: &PlatformConfig, config: &RunConfig) -> Result<RunResult, RunError> {
    platform_config.validate()?;
    config.validate(platform_config)?;
    let policy = make_policy(config.policy, config.workers, config.seed)?;

    let start = Instant::now();
    let mut sim = Simulation::new(config.seed);
    let platform = Platform::build(&mut sim, platform_config)?;
    let mut mailboxes = Mailboxes::new(&sim, platform.network());

    let resources: Vec<_> = match config.placement {
        Placement::Hosts => platform.hosts()[..config.workers]
            .iter()
            .map(|host| (host.name().to_string(), host.compute(), host.speed()))
            .collect(),
        Placement::Vms => platform.vms()[..config.workers]
            .iter()
            .map(|vm| {
                let host_speed = platform.host(vm.host()).map_or(vm.speed(), |host| host.speed());
                (vm.host().to_string(), vm.compute(), host_speed)
            })
            .collect(),
    };
    let scheduler_host = match config.placement {
        Placement::Hosts => platform.hosts()[config.workers].name().to_string(),
        Placement::Vms => platform.hosts()[platform.hosts().len() - 1].name().to_string(),
    };

    let mut worker_mailboxes = Vec::with_capacity(config.workers);
    let mut stats = Vec::with_capacity(config.workers);
    for (i, (host, compute, host_speed)) in resources.into_iter().enumerate() {
        let ctx = sim.create_context(worker_name(i + 1));
        let worker_id = ctx.id();
        platform.set_location(worker_id, &host);
        let mailbox = mailboxes.by_name_or_create(&mailbox_name(i + 1));
        let worker = Worker::new(
            ctx,
            mailbox.clone(),
            compute,
            host_speed,
            config.task,
            config.sentinel,
        );
        stats.push(worker.stats());
        worker_mailboxes.push(mailbox);
        sim.spawn_actor(worker_id, worker.run());
    }

    let ctx = sim.create_context(SCHEDULER_NAME);
    let scheduler_id = ctx.id();
    platform.set_location(scheduler_id, &scheduler_host);
    let dispatcher = Dispatcher::new(
        ctx,
        worker_mailboxes,
        config.tasks,
        config.task,
        config.message_size,
        config.send_mode,
        policy,
    );
    let assignments = dispatcher.assignments();
    sim.spawn_actor(scheduler_id, dispatcher.run());

    sim.run()?;
    info!(target: "simulation", "Simulation time {}", sim.time());

    let workers = stats.iter().map(|s| s.borrow().clone()).collect();
    let assignments = assignments.borrow().clone();
    Ok(RunResult {
        simulated_time: sim.time(),
        wall_time: start.elapsed().as_secs_f64(),
        workers,
        assignments,
        events: sim.event_count(),
    })
}
