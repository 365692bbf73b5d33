//! Network model where each node is connected to a common switch by its uplink.
//!
//! The route between two distinct nodes goes through both uplinks: the latency is the sum of the uplink latencies
//! and the bandwidth is the minimum of the uplink bandwidths. An explicit link between two nodes replaces this
//! route. Communication within a node uses the loopback link.

use std::collections::HashMap;

use crate::{Link, NetworkModel, NodeId};

/// Network model with per-node uplinks and optional explicit links.
pub struct TopologyNetworkModel {
    uplinks: Vec<Link>,
    links: HashMap<(NodeId, NodeId), Link>,
    loopback: Link,
}

impl TopologyNetworkModel {
    /// Creates a model with the default loopback link (zero latency, infinite bandwidth).
    pub fn new() -> Self {
        Self::with_loopback(Link::loopback())
    }

    /// Creates a model with the given loopback link.
    pub fn with_loopback(loopback: Link) -> Self {
        Self {
            uplinks: Vec::new(),
            links: HashMap::new(),
            loopback,
        }
    }

    /// Returns the link used for communication between the given nodes.
    pub fn route(&self, src: NodeId, dst: NodeId) -> Link {
        if src == dst {
            return self.loopback;
        }
        if let Some(link) = self.links.get(&(src.min(dst), src.max(dst))) {
            return *link;
        }
        let (src_uplink, dst_uplink) = (self.uplink(src), self.uplink(dst));
        Link::new(
            src_uplink.latency + dst_uplink.latency,
            src_uplink.bandwidth.min(dst_uplink.bandwidth),
        )
    }

    fn uplink(&self, node: NodeId) -> Link {
        match self.uplinks.get(node) {
            Some(link) => *link,
            None => panic!("Node {} is not connected to the network", node),
        }
    }
}

impl Default for TopologyNetworkModel {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkModel for TopologyNetworkModel {
    fn latency(&self, src: NodeId, dst: NodeId) -> f64 {
        self.route(src, dst).latency
    }

    fn bandwidth(&self, src: NodeId, dst: NodeId) -> f64 {
        self.route(src, dst).bandwidth
    }

    fn transfer_time(&self, src: NodeId, dst: NodeId, size: f64) -> f64 {
        self.route(src, dst).transfer_time(size)
    }

    fn on_node_added(&mut self, node: NodeId, uplink: Link) {
        if self.uplinks.len() <= node {
            self.uplinks.resize(node + 1, Link::loopback());
        }
        self.uplinks[node] = uplink;
    }

    fn on_link_added(&mut self, src: NodeId, dst: NodeId, link: Link) {
        self.links.insert((src.min(dst), src.max(dst)), link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TopologyNetworkModel {
        let mut model = TopologyNetworkModel::new();
        model.on_node_added(0, Link::new(0.5, 1000.));
        model.on_node_added(1, Link::new(0.25, 500.));
        model.on_node_added(2, Link::new(0.125, 2000.));
        model
    }

    #[test]
    fn route_through_uplinks() {
        let model = model();
        assert_eq!(model.route(0, 1), Link::new(0.75, 500.));
        assert_eq!(model.route(2, 0), Link::new(0.625, 1000.));
    }

    #[test]
    fn explicit_link_is_symmetric() {
        let mut model = model();
        model.on_link_added(2, 0, Link::new(0.01, 10.));
        assert_eq!(model.route(0, 2), Link::new(0.01, 10.));
        assert_eq!(model.route(2, 0), Link::new(0.01, 10.));
        assert_eq!(model.route(0, 1), Link::new(0.75, 500.));
    }

    #[test]
    fn loopback_within_node() {
        let model = model();
        assert_eq!(model.transfer_time(1, 1, 1e6), 0.);
        let model = TopologyNetworkModel::with_loopback(Link::new(0.5, 100.));
        assert_eq!(model.transfer_time(3, 3, 50.), 1.);
    }
}
