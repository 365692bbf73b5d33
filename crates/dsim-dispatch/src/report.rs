//! Persisting run results.

use std::fs::OpenOptions;
use std::path::Path;

use serde::Serialize;

use crate::config::RunConfig;
use crate::platform::PlatformConfig;
use crate::run::RunResult;

/// Summary of a run stored as one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Number of workers.
    pub workers: usize,
    /// Speed of the first host.
    pub host_speed: f64,
    /// Number of tasks.
    pub tasks: usize,
    /// Task size, empty in timestamp mode.
    pub task_size: Option<f64>,
    /// Simulated time.
    pub simulated_time: f64,
    /// Wall-clock time in seconds.
    pub wall_time: f64,
}

impl ResultRow {
    /// Creates a row for the run result.
    pub fn new(platform: &PlatformConfig, config: &RunConfig, result: &RunResult) -> Self {
        Self {
            workers: config.workers,
            host_speed: platform.hosts.first().map(|h| h.speed).unwrap_or(0.),
            tasks: config.tasks,
            task_size: config.task_size(),
            simulated_time: result.simulated_time,
            wall_time: result.wall_time,
        }
    }
}

/// Appends the row to the CSV file, writing the header if the file is new or empty.
pub fn append_result<P: AsRef<Path>>(path: P, row: &ResultRow) -> Result<(), csv::Error> {
    let path = path.as_ref();
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
