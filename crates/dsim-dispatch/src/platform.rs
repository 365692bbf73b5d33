//! Platform description and construction.
//!
//! A platform consists of hosts connected to the network by their uplinks, optional explicit links between
//! hosts and optional virtual machines placed on hosts. It can be loaded from a YAML file:
//!
//! ```yaml
//! hosts:
//!   - {name: HOST_1, speed: 100, latency: 0.001, bandwidth: 1000}
//!   - {name: HOST_2, speed: 100, latency: 0.001, bandwidth: 1000}
//! links:
//!   - {src: HOST_1, dst: HOST_2, latency: 0.0005, bandwidth: 10000}
//! vms:
//!   - {name: VM_1, host: HOST_1, cores: 2}
//! loopback: {latency: 0, bandwidth: 1.0e9}
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use sugars::{boxed, rc, refcell};

use dsim_compute::vm::partition_speed;
use dsim_compute::{Compute, VirtualMachine};
use dsim_core::{Id, Simulation};
use dsim_network::models::TopologyNetworkModel;
use dsim_network::{Link, Network};

use crate::error::ConfigError;
use crate::run::SCHEDULER_NAME;

/// Host description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host name.
    pub name: String,
    /// Computing speed (flop/s).
    pub speed: f64,
    /// Uplink latency (s).
    pub latency: f64,
    /// Uplink bandwidth (bytes/s).
    pub bandwidth: f64,
}

/// Explicit link between two hosts, replaces the route through their uplinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// First host.
    pub src: String,
    /// Second host.
    pub dst: String,
    /// Link latency (s).
    pub latency: f64,
    /// Link bandwidth (bytes/s).
    pub bandwidth: f64,
}

/// Virtual machine description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmConfig {
    /// VM name.
    pub name: String,
    /// Name of the host the VM is placed on.
    pub host: String,
    /// Number of cores, determines the VM share of the host speed.
    pub cores: u32,
}

/// Platform description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Hosts.
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    /// Explicit links between hosts.
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    /// Virtual machines.
    #[serde(default)]
    pub vms: Vec<VmConfig>,
    /// Link used for communication within a host (zero latency and infinite bandwidth by default).
    #[serde(default)]
    pub loopback: Option<Link>,
}

fn check_positive(name: &str, param: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0. {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name: name.to_string(),
            param,
            value,
        })
    }
}

fn check_non_negative(name: &str, param: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0. {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name: name.to_string(),
            param,
            value,
        })
    }
}

// Names of actor components, which cannot be shared with hosts and VMs.
fn is_reserved(name: &str) -> bool {
    name == SCHEDULER_NAME
        || name
            .strip_prefix("worker_")
            .map_or(false, |index| index.parse::<usize>().is_ok())
}

impl PlatformConfig {
    /// Creates a platform of `host_count` identical hosts named `HOST_1`, ..., `HOST_<host_count>`.
    pub fn cluster(host_count: usize, speed: f64, latency: f64, bandwidth: f64) -> Self {
        Self {
            hosts: (1..=host_count)
                .map(|i| HostConfig {
                    name: format!("HOST_{}", i),
                    speed,
                    latency,
                    bandwidth,
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Adds `count` single-core VMs named `VM_1`, ..., `VM_<count>`, placing `per_host` VMs on each host in order.
    pub fn add_vms(&mut self, count: usize, per_host: usize) -> Result<(), ConfigError> {
        let per_host = per_host.max(1);
        let required = count / per_host + usize::from(count % per_host != 0);
        if required > self.hosts.len() {
            return Err(ConfigError::NotEnoughResources {
                kind: "hosts",
                required,
                available: self.hosts.len(),
            });
        }
        let first = self.vms.len();
        for i in 0..count {
            self.vms.push(VmConfig {
                name: format!("VM_{}", first + i + 1),
                host: self.hosts[i / per_host].name.clone(),
                cores: 1,
            });
        }
        Ok(())
    }

    /// Parses platform description from YAML string, `source` is used in error messages.
    pub fn from_yaml(yaml: &str, source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: source.to_string(),
            source: e,
        })
    }

    /// Reads platform description from YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_yaml(&yaml, path)
    }

    /// Returns the host with the given name.
    pub fn host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Checks names, references and parameter ranges.
    ///
    /// Host and VM names must be unique and differ from the names of actors (`scheduler`, `worker_<i>`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for host in &self.hosts {
            if is_reserved(&host.name) || !names.insert(host.name.as_str()) {
                return Err(ConfigError::DuplicateName(host.name.clone()));
            }
            check_positive(&host.name, "speed", host.speed)?;
            check_non_negative(&host.name, "latency", host.latency)?;
            check_positive(&host.name, "bandwidth", host.bandwidth)?;
        }
        for link in &self.links {
            for end in [&link.src, &link.dst] {
                if self.host(end).is_none() {
                    return Err(ConfigError::UnknownHost(end.clone()));
                }
            }
            let name = format!("{}-{}", link.src, link.dst);
            check_non_negative(&name, "latency", link.latency)?;
            check_positive(&name, "bandwidth", link.bandwidth)?;
        }
        for vm in &self.vms {
            if is_reserved(&vm.name) || !names.insert(vm.name.as_str()) {
                return Err(ConfigError::DuplicateName(vm.name.clone()));
            }
            if self.host(&vm.host).is_none() {
                return Err(ConfigError::UnknownHost(vm.host.clone()));
            }
            if vm.cores == 0 {
                return Err(ConfigError::NoCores(vm.name.clone()));
            }
        }
        if let Some(loopback) = &self.loopback {
            check_non_negative("loopback", "latency", loopback.latency)?;
            check_positive("loopback", "bandwidth", loopback.bandwidth)?;
        }
        Ok(())
    }
}

/// Host of the built platform.
pub struct Host {
    name: String,
    compute: Rc<RefCell<Compute>>,
}

impl Host {
    /// Returns the host name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the host speed.
    pub fn speed(&self) -> f64 {
        self.compute.borrow().speed()
    }

    /// Returns the compute resource of the host.
    pub fn compute(&self) -> Rc<RefCell<Compute>> {
        self.compute.clone()
    }
}

/// Platform built in a simulation: compute resources of hosts and VMs and the network connecting hosts.
pub struct Platform {
    hosts: Vec<Host>,
    vms: Vec<VirtualMachine>,
    network: Rc<RefCell<Network>>,
}

impl Platform {
    /// Validates the description and creates the platform components in the simulation.
    ///
    /// Each host and each VM gets its own [`Compute`] component named after it. A VM gets the share of its host
    /// speed proportional to its cores relative to all VM cores on the host.
    pub fn build(sim: &mut Simulation, config: &PlatformConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let model = match config.loopback {
            Some(loopback) => TopologyNetworkModel::with_loopback(loopback),
            None => TopologyNetworkModel::new(),
        };
        let mut network = Network::new(boxed!(model));

        let mut hosts = Vec::with_capacity(config.hosts.len());
        for host in &config.hosts {
            network.add_node(&host.name, Link::new(host.latency, host.bandwidth));
            let compute = rc!(refcell!(Compute::new(host.speed, sim.create_context(&host.name))));
            sim.add_handler(&host.name, compute.clone());
            hosts.push(Host {
                name: host.name.clone(),
                compute,
            });
        }
        for link in &config.links {
            network.add_link(&link.src, &link.dst, Link::new(link.latency, link.bandwidth));
        }

        let mut shares: HashMap<&str, VecDeque<f64>> = HashMap::new();
        for host in &config.hosts {
            let cores: Vec<u32> = config
                .vms
                .iter()
                .filter(|vm| vm.host == host.name)
                .map(|vm| vm.cores)
                .collect();
            if !cores.is_empty() {
                shares.insert(host.name.as_str(), partition_speed(host.speed, &cores).into());
            }
        }
        let mut vms = Vec::with_capacity(config.vms.len());
        for vm in &config.vms {
            let speed = shares
                .get_mut(vm.host.as_str())
                .and_then(|s| s.pop_front())
                .ok_or_else(|| ConfigError::UnknownHost(vm.host.clone()))?;
            let compute = rc!(refcell!(Compute::new(speed, sim.create_context(&vm.name))));
            sim.add_handler(&vm.name, compute.clone());
            vms.push(VirtualMachine::new(&vm.name, &vm.host, vm.cores, compute));
        }

        Ok(Self {
            hosts,
            vms,
            network: rc!(refcell!(network)),
        })
    }

    /// Returns the hosts in the order of their declaration.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Returns the host with the given name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Returns the VMs in the order of their declaration.
    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    /// Returns the VM with the given name.
    pub fn vm(&self, name: &str) -> Option<&VirtualMachine> {
        self.vms.iter().find(|vm| vm.name() == name)
    }

    /// Returns the network connecting the hosts.
    pub fn network(&self) -> Rc<RefCell<Network>> {
        self.network.clone()
    }

    /// Places the component on the host with the given name.
    pub fn set_location(&self, id: Id, host: &str) {
        self.network.borrow_mut().set_location(id, host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATFORM: &str = r#"
hosts:
  - {name: HOST_1, speed: 100, latency: 0.25, bandwidth: 1000}
  - {name: HOST_2, speed: 200, latency: 0.5, bandwidth: 500}
links:
  - {src: HOST_1, dst: HOST_2, latency: 0.125, bandwidth: 100}
vms:
  - {name: VM_1, host: HOST_2, cores: 1}
  - {name: VM_2, host: HOST_2, cores: 3}
"#;

    #[test]
    fn parse_yaml() {
        let config = PlatformConfig::from_yaml(PLATFORM, "inline").unwrap();
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.host("HOST_2").unwrap().speed, 200.);
        assert_eq!(config.links[0].bandwidth, 100.);
        assert_eq!(config.vms[1].cores, 3);
        assert_eq!(config.loopback, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn build_partitions_host_speed_among_vms() {
        let mut sim = Simulation::new(123);
        let config = PlatformConfig::from_yaml(PLATFORM, "inline").unwrap();
        let platform = Platform::build(&mut sim, &config).unwrap();
        assert_eq!(platform.host("HOST_1").unwrap().speed(), 100.);
        assert_eq!(platform.vm("VM_1").unwrap().speed(), 50.);
        assert_eq!(platform.vm("VM_2").unwrap().speed(), 150.);
        assert_eq!(platform.network().borrow().nodes(), vec!["HOST_1", "HOST_2"]);
    }

    #[test]
    fn build_uses_explicit_link() {
        let mut sim = Simulation::new(123);
        let config = PlatformConfig::from_yaml(PLATFORM, "inline").unwrap();
        let platform = Platform::build(&mut sim, &config).unwrap();
        let a = sim.create_context("a");
        let b = sim.create_context("b");
        platform.set_location(a.id(), "HOST_1");
        platform.set_location(b.id(), "HOST_2");
        assert_eq!(platform.network().borrow().transfer_time(a.id(), b.id(), 100.), 1.125);
    }

    #[test]
    fn cluster_names() {
        let config = PlatformConfig::cluster(3, 10., 0.5, 100.);
        let names: Vec<_> = config.hosts.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["HOST_1", "HOST_2", "HOST_3"]);
    }

    #[test]
    fn add_vms_packs_hosts() {
        let mut config = PlatformConfig::cluster(3, 10., 0.5, 100.);
        config.add_vms(3, 2).unwrap();
        let hosts: Vec<_> = config.vms.iter().map(|vm| vm.host.as_str()).collect();
        assert_eq!(hosts, vec!["HOST_1", "HOST_1", "HOST_2"]);
        assert_eq!(config.vms[2].name, "VM_3");
        assert!(matches!(
            config.add_vms(10, 1),
            Err(ConfigError::NotEnoughResources { required: 10, .. })
        ));
        assert!(matches!(
            config.add_vms(usize::MAX, 2),
            Err(ConfigError::NotEnoughResources { available: 3, .. })
        ));
        assert_eq!(config.vms.len(), 3);
    }

    #[test]
    fn validation_errors() {
        let mut config = PlatformConfig::cluster(2, 10., 0.5, 100.);
        config.hosts[1].name = "HOST_1".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(name)) if name == "HOST_1"));

        let mut config = PlatformConfig::cluster(2, 10., 0.5, 100.);
        config.hosts[0].speed = 0.;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { param: "speed", .. })
        ));

        let mut config = PlatformConfig::cluster(2, 10., 0.5, 100.);
        config.hosts[1].latency = -1.;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { param: "latency", .. })
        ));

        let mut config = PlatformConfig::cluster(1, 10., 0.5, 100.);
        config.vms.push(VmConfig {
            name: "VM_1".to_string(),
            host: "HOST_9".to_string(),
            cores: 1,
        });
        assert!(matches!(config.validate(), Err(ConfigError::UnknownHost(name)) if name == "HOST_9"));

        config.vms[0].host = "HOST_1".to_string();
        config.vms[0].cores = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoCores(_))));
    }

    #[test]
    fn actor_names_rejected() {
        for name in ["scheduler", "worker_1", "worker_12"] {
            let mut config = PlatformConfig::cluster(2, 10., 0.5, 100.);
            config.hosts[1].name = name.to_string();
            assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(n)) if n == name));

            let mut config = PlatformConfig::cluster(2, 10., 0.5, 100.);
            config.vms.push(VmConfig {
                name: name.to_string(),
                host: "HOST_1".to_string(),
                cores: 1,
            });
            assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(n)) if n == name));
        }

        let mut config = PlatformConfig::cluster(1, 10., 0.5, 100.);
        config.hosts[0].name = "worker_node".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            PlatformConfig::from_file("/nonexistent/platform.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn invalid_yaml() {
        assert!(matches!(
            PlatformConfig::from_yaml("hosts: 42", "inline"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
