//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::PlatformConfig;

/// Payload value of the finish signal sent to workers.
pub const SENTINEL: f64 = -1.0;

/// Maximum number of hosts in a cluster generated by [`RunConfig::cluster_size`].
pub const MAX_CLUSTER_SIZE: usize = 1 << 20;

/// Interpretation of task payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Payload is the send time, the worker measures the communication time
    /// and then computes `2 * speed` flops.
    Timestamp,
    /// Payload is the amount of work (flops) to compute.
    Work {
        /// Task size.
        size: f64,
    },
}

/// Dispatch policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Task `i` goes to worker `i mod W`.
    RoundRobin,
    /// Each task goes to a uniformly random worker.
    Random,
}

/// How the scheduler sends tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendMode {
    /// Send returns immediately.
    Detached,
    /// Scheduler waits until each message reaches the worker.
    Synchronous,
}

/// Which payloads are treated as the finish signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentinelRule {
    /// Payload `< 0`.
    Negative,
    /// Payload `<= 0`.
    NonPositive,
}

impl SentinelRule {
    /// Checks whether the payload is the finish signal.
    pub fn is_sentinel(&self, payload: f64) -> bool {
        match self {
            SentinelRule::Negative => payload < 0.,
            SentinelRule::NonPositive => payload <= 0.,
        }
    }
}

/// Where workers are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Worker `i` runs on host `i`, the scheduler runs on host `W + 1`.
    Hosts,
    /// Worker `i` runs on VM `i`, the scheduler runs on the last host.
    Vms,
}

/// Configuration of a dispatching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of workers.
    pub workers: usize,
    /// Number of tasks.
    pub tasks: usize,
    /// Task payload interpretation.
    pub task: TaskKind,
    /// Dispatch policy.
    pub policy: PolicyKind,
    /// Size of each message in bytes.
    pub message_size: f64,
    /// How the scheduler sends messages.
    pub send_mode: SendMode,
    /// Finish signal detection rule.
    pub sentinel: SentinelRule,
    /// Worker placement.
    pub placement: Placement,
    /// Random seed.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            tasks: 100,
            task: TaskKind::Timestamp,
            policy: PolicyKind::RoundRobin,
            message_size: 1.,
            send_mode: SendMode::Detached,
            sentinel: SentinelRule::Negative,
            placement: Placement::Hosts,
            seed: 123,
        }
    }
}

impl RunConfig {
    /// Checks the configuration against the platform description.
    pub fn validate(&self, platform: &PlatformConfig) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !(self.message_size >= 0.) {
            return Err(ConfigError::InvalidValue {
                name: "run".to_string(),
                param: "message size",
                value: self.message_size,
            });
        }
        if let TaskKind::Work { size } = self.task {
            if !(size >= 0.) {
                return Err(ConfigError::InvalidValue {
                    name: "run".to_string(),
                    param: "task size",
                    value: size,
                });
            }
        }
        let (kind, required, available) = match self.placement {
            Placement::Hosts => match self.workers.checked_add(1) {
                Some(required) => ("hosts", required, platform.hosts.len()),
                None => {
                    return Err(ConfigError::InvalidValue {
                        name: "run".to_string(),
                        param: "worker count",
                        value: self.workers as f64,
                    })
                }
            },
            Placement::Vms if platform.hosts.is_empty() => ("hosts", 1, 0),
            Placement::Vms => ("VMs", self.workers, platform.vms.len()),
        };
        if available < required {
            return Err(ConfigError::NotEnoughResources {
                kind,
                required,
                available,
            });
        }
        Ok(())
    }

    /// Returns the number of hosts in a generated cluster which fits the run:
    /// one host per worker (or per `vms_per_host` workers in VM mode) plus the scheduler host.
    pub fn cluster_size(&self, vms_per_host: usize) -> Result<usize, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let per_host = vms_per_host.max(1);
        let worker_hosts = match self.placement {
            Placement::Hosts => self.workers,
            Placement::Vms => self.workers / per_host + usize::from(self.workers % per_host != 0),
        };
        match worker_hosts.checked_add(1) {
            Some(hosts) if hosts <= MAX_CLUSTER_SIZE => Ok(hosts),
            _ => Err(ConfigError::InvalidValue {
                name: "run".to_string(),
                param: "worker count",
                value: self.workers as f64,
            }),
        }
    }

    /// Returns the task size or `None` in timestamp mode.
    pub fn task_size(&self) -> Option<f64> {
        match self.task {
            TaskKind::Timestamp => None,
            TaskKind::Work { size } => Some(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_boundary() {
        assert!(SentinelRule::Negative.is_sentinel(-1.));
        assert!(!SentinelRule::Negative.is_sentinel(0.));
        assert!(SentinelRule::NonPositive.is_sentinel(0.));
        assert!(!SentinelRule::NonPositive.is_sentinel(1e-9));
    }

    #[test]
    fn zero_workers_rejected() {
        let config = RunConfig {
            workers: 0,
            ..Default::default()
        };
        let platform = PlatformConfig::cluster(5, 1., 0., 1.);
        assert!(matches!(config.validate(&platform), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn placement_requires_resources() {
        let config = RunConfig::default();
        assert!(config.validate(&PlatformConfig::cluster(5, 1., 0., 1.)).is_ok());
        assert!(matches!(
            config.validate(&PlatformConfig::cluster(4, 1., 0., 1.)),
            Err(ConfigError::NotEnoughResources {
                kind: "hosts",
                required: 5,
                available: 4
            })
        ));

        let config = RunConfig {
            placement: Placement::Vms,
            ..Default::default()
        };
        let mut platform = PlatformConfig::cluster(2, 1., 0., 1.);
        platform.add_vms(3, 2).unwrap();
        assert!(matches!(
            config.validate(&platform),
            Err(ConfigError::NotEnoughResources { kind: "VMs", .. })
        ));
        platform.add_vms(1, 2).unwrap();
        assert!(config.validate(&platform).is_ok());
    }

    #[test]
    fn huge_worker_count_rejected() {
        let platform = PlatformConfig::cluster(3, 1., 0., 1.);
        let config = RunConfig {
            workers: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&platform),
            Err(ConfigError::InvalidValue { param: "worker count", .. })
        ));
        let config = RunConfig {
            workers: usize::MAX,
            placement: Placement::Vms,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&platform),
            Err(ConfigError::NotEnoughResources { kind: "VMs", .. })
        ));
    }

    #[test]
    fn generated_cluster_size() {
        let config = RunConfig::default();
        assert_eq!(config.cluster_size(3).unwrap(), 5);
        let config = RunConfig {
            workers: 5,
            placement: Placement::Vms,
            ..Default::default()
        };
        assert_eq!(config.cluster_size(2).unwrap(), 4);
        assert_eq!(config.cluster_size(0).unwrap(), 6);

        for placement in [Placement::Hosts, Placement::Vms] {
            let config = RunConfig {
                workers: usize::MAX,
                placement,
                ..Default::default()
            };
            assert!(matches!(
                config.cluster_size(1),
                Err(ConfigError::InvalidValue { param: "worker count", .. })
            ));
        }
        let config = RunConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.cluster_size(1), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn negative_sizes_rejected() {
        let platform = PlatformConfig::cluster(5, 1., 0., 1.);
        let config = RunConfig {
            task: TaskKind::Work { size: -5. },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&platform),
            Err(ConfigError::InvalidValue { param: "task size", .. })
        ));
        let config = RunConfig {
            message_size: -1.,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&platform),
            Err(ConfigError::InvalidValue { param: "message size", .. })
        ));
    }

    #[test]
    fn serialize_as_yaml() {
        let config = RunConfig {
            task: TaskKind::Work { size: 50. },
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("policy: round-robin"));
        let parsed: RunConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
