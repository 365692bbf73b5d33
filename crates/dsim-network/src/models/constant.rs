//! Network model with the same latency and bandwidth between any nodes.

use crate::{NetworkModel, NodeId};

/// Network model with the same latency and bandwidth between any nodes.
pub struct ConstantNetworkModel {
    latency: f64,
    bandwidth: f64,
}

impl ConstantNetworkModel {
    /// Creates a new network model with specified latency and bandwidth.
    pub fn new(latency: f64, bandwidth: f64) -> Self {
        Self { latency, bandwidth }
    }
}

impl NetworkModel for ConstantNetworkModel {
    fn latency(&self, _src: NodeId, _dst: NodeId) -> f64 {
        self.latency
    }

    fn bandwidth(&self, _src: NodeId, _dst: NodeId) -> f64 {
        self.bandwidth
    }
}
