use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::info;

use dsim_dispatch::config::{Placement, PolicyKind, SendMode, SentinelRule, TaskKind};
use dsim_dispatch::report::{append_result, ResultRow};
use dsim_dispatch::{run, ConfigError, PlatformConfig, RunConfig, RunError};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Policy {
    RoundRobin,
    Random,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Sentinel {
    /// Payloads below zero finish the worker
    Negative,
    /// Payloads below or equal to zero finish the worker
    NonPositive,
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Simulates dispatching of tasks from a scheduler to a pool of workers
struct Args {
    /// Path to YAML file with platform description (a cluster of identical hosts is generated if not set)
    #[arg(short, long)]
    platform: Option<PathBuf>,

    /// Host speed of generated cluster (flop/s)
    #[arg(long, default_value_t = 1e9)]
    speed: f64,

    /// Host uplink latency of generated cluster (s)
    #[arg(long, default_value_t = 1e-4)]
    latency: f64,

    /// Host uplink bandwidth of generated cluster (bytes/s)
    #[arg(long, default_value_t = 1.25e8)]
    bandwidth: f64,

    /// Number of workers
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Number of tasks
    #[arg(short, long, default_value_t = 100)]
    tasks: usize,

    /// Task size (flops), tasks carry their send time if not set
    #[arg(long)]
    task_size: Option<f64>,

    /// Dispatch policy
    #[arg(long, value_enum, default_value_t = Policy::RoundRobin)]
    policy: Policy,

    /// Message size (bytes)
    #[arg(long, default_value_t = 1.)]
    message_size: f64,

    /// Wait until each message reaches the worker
    #[arg(long)]
    sync_send: bool,

    /// Rule for recognizing the finish signal
    #[arg(long, value_enum, default_value_t = Sentinel::Negative)]
    sentinel: Sentinel,

    /// Place workers on virtual machines
    #[arg(long)]
    vms: bool,

    /// Number of VMs per host in generated cluster
    #[arg(long, default_value_t = 1)]
    vms_per_host: usize,

    /// Random seed
    #[arg(long, default_value_t = 123)]
    seed: u64,

    /// Path to CSV file to append the results to
    #[arg(short, long)]
    results: Option<PathBuf>,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            workers: self.workers,
            tasks: self.tasks,
            task: match self.task_size {
                Some(size) => TaskKind::Work { size },
                None => TaskKind::Timestamp,
            },
            policy: match self.policy {
                Policy::RoundRobin => PolicyKind::RoundRobin,
                Policy::Random => PolicyKind::Random,
            },
            message_size: self.message_size,
            send_mode: if self.sync_send {
                SendMode::Synchronous
            } else {
                SendMode::Detached
            },
            sentinel: match self.sentinel {
                Sentinel::Negative => SentinelRule::Negative,
                Sentinel::NonPositive => SentinelRule::NonPositive,
            },
            placement: if self.vms { Placement::Vms } else { Placement::Hosts },
            seed: self.seed,
        }
    }

    fn platform(&self, config: &RunConfig) -> Result<PlatformConfig, ConfigError> {
        if let Some(path) = &self.platform {
            return PlatformConfig::from_file(&path.to_string_lossy());
        }
        let hosts = config.cluster_size(self.vms_per_host)?;
        let mut platform = PlatformConfig::cluster(hosts, self.speed, self.latency, self.bandwidth);
        if self.vms {
            platform.add_vms(self.workers, self.vms_per_host)?;
        }
        Ok(platform)
    }
}

fn main() -> ExitCode {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let config = args.run_config();
    let platform = match args.platform(&config) {
        Ok(platform) => platform,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match run(&platform, &config) {
        Ok(result) => result,
        Err(RunError::Config(e)) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
        Err(RunError::Simulation(e)) => {
            eprintln!("Simulation failed: {}", e);
            return ExitCode::from(3);
        }
    };

    info!("Events: {}, wall time: {:.3} s", result.events, result.wall_time);
    println!("Simulation time {}", result.simulated_time);

    if let Some(path) = &args.results {
        let row = ResultRow::new(&platform, &config, &result);
        if let Err(e) = append_result(path, &row) {
            eprintln!("Cannot write results to {}: {}", path.display(), e);
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}
