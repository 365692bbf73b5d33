//! Virtual machines.
//!
//! A virtual machine borrows a part of its host's speed proportional to the number of its cores relative to all
//! VM cores declared on the host. Computations started on a VM fair-share the VM's part only.

use std::cell::RefCell;
use std::rc::Rc;

use crate::compute::Compute;

/// Virtual machine placed on a host.
pub struct VirtualMachine {
    name: String,
    host: String,
    cores: u32,
    compute: Rc<RefCell<Compute>>,
}

impl VirtualMachine {
    /// Creates a VM backed by the given compute resource.
    pub fn new(name: &str, host: &str, cores: u32, compute: Rc<RefCell<Compute>>) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            cores,
            compute,
        }
    }

    /// Returns the VM name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the host the VM is placed on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the number of VM cores.
    pub fn cores(&self) -> u32 {
        self.cores
    }

    /// Returns the VM speed, i.e. its part of the host speed.
    pub fn speed(&self) -> f64 {
        self.compute.borrow().speed()
    }

    /// Returns the compute resource of the VM.
    pub fn compute(&self) -> Rc<RefCell<Compute>> {
        self.compute.clone()
    }
}

/// Splits the host speed among VMs proportionally to their cores.
///
/// Panics if the total number of cores is zero.
pub fn partition_speed(host_speed: f64, cores: &[u32]) -> Vec<f64> {
    let total: u32 = cores.iter().sum();
    assert!(total > 0, "Total number of VM cores must be positive");
    cores
        .iter()
        .map(|&c| host_speed * c as f64 / total as f64)
        .collect()
}
