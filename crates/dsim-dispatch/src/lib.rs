//! Simulation of task dispatching from a scheduler to a pool of workers.
//!
//! The scheduler sends tasks to the workers' mailboxes according to a [dispatch policy](policy), then sends a
//! finish signal to every worker. Each worker receives tasks from its mailbox and runs the corresponding
//! computations on the host or virtual machine it is placed on.
//!
//! Use [`run::run`] to simulate a configured run on a platform and [`report::append_result`] to store the results.

#![warn(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod platform;
pub mod policy;
pub mod report;
pub mod run;
pub mod worker;

pub use config::RunConfig;
pub use error::{ConfigError, RunError};
pub use platform::{Platform, PlatformConfig};
pub use run::{run, RunResult};
