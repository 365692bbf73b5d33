//! Network model interface.

use crate::{Link, NodeId};

/// Network model interface.
///
/// Provides latency and bandwidth between network nodes. Models which depend on the network structure are notified
/// about added nodes and links, other models may ignore these notifications.
pub trait NetworkModel {
    /// Returns the network latency from node `src` to node `dst`.
    fn latency(&self, src: NodeId, dst: NodeId) -> f64;

    /// Returns the network bandwidth from node `src` to node `dst`.
    fn bandwidth(&self, src: NodeId, dst: NodeId) -> f64;

    /// Returns the time needed to transfer `size` bytes from node `src` to node `dst`.
    fn transfer_time(&self, src: NodeId, dst: NodeId, size: f64) -> f64 {
        self.latency(src, dst) + size / self.bandwidth(src, dst)
    }

    /// Callback for notifying the model about a new node connected to the network with the given uplink.
    fn on_node_added(&mut self, _node: NodeId, _uplink: Link) {}

    /// Callback for notifying the model about a new link between two nodes.
    fn on_link_added(&mut self, _src: NodeId, _dst: NodeId, _link: Link) {}
}
