//! Network link.

use serde::{Deserialize, Serialize};

/// A link between two nodes in the network.
///
/// Links are not contended: each transfer gets the full link bandwidth.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Link latency (seconds).
    pub latency: f64,
    /// Link bandwidth (bytes per second).
    pub bandwidth: f64,
}

impl Link {
    /// Creates a new link.
    pub fn new(latency: f64, bandwidth: f64) -> Self {
        Self { latency, bandwidth }
    }

    /// Creates a link with zero latency and infinite bandwidth, used for communication within a node.
    pub fn loopback() -> Self {
        Self::new(0., f64::INFINITY)
    }

    /// Returns the time needed to transfer `size` bytes over the link.
    pub fn transfer_time(&self, size: f64) -> f64 {
        self.latency + size / self.bandwidth
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::loopback()
    }
}
