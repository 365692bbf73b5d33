//! Dispatch policies.
//!
//! Policies are load-unaware: the target worker depends only on the task index (and the random seed).

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::config::PolicyKind;
use crate::error::ConfigError;

/// Selects the worker for each task.
pub trait DispatchPolicy {
    /// Returns the index of the worker for task `task`, less than the number of workers.
    fn select(&mut self, task: usize) -> usize;

    /// Returns the policy name.
    fn name(&self) -> &'static str;
}

/// Task `i` goes to worker `i mod W`.
pub struct RoundRobin {
    workers: usize,
}

impl RoundRobin {
    /// Creates the policy for the given number of workers, which must be positive.
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(Self { workers })
    }
}

impl DispatchPolicy for RoundRobin {
    fn select(&mut self, task: usize) -> usize {
        task % self.workers
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Each task goes to a uniformly random worker.
pub struct RandomPolicy {
    workers: usize,
    rand: Pcg64,
}

impl RandomPolicy {
    /// Creates the policy for the given number of workers, which must be positive.
    pub fn new(workers: usize, seed: u64) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(Self {
            workers,
            rand: Pcg64::seed_from_u64(seed),
        })
    }
}

impl DispatchPolicy for RandomPolicy {
    fn select(&mut self, _task: usize) -> usize {
        self.rand.gen_range(0..self.workers)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Creates the policy of the given kind.
pub fn make_policy(kind: PolicyKind, workers: usize, seed: u64) -> Result<Box<dyn DispatchPolicy>, ConfigError> {
    let policy: Box<dyn DispatchPolicy> = match kind {
        PolicyKind::RoundRobin => Box::new(RoundRobin::new(workers)?),
        PolicyKind::Random => Box::new(RandomPolicy::new(workers, seed)?),
    };
    Ok(policy)
}
