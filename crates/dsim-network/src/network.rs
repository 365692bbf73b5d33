//! Network connecting simulation components.

use std::collections::HashMap;

use log::debug;

use dsim_core::Id;

use crate::{Link, NetworkModel, Node, NodeId};

/// Network with named nodes and components placed on them.
pub struct Network {
    model: Box<dyn NetworkModel>,
    nodes: Vec<Node>,
    node_ids: HashMap<String, NodeId>,
    locations: HashMap<Id, NodeId>,
}

impl Network {
    /// Creates an empty network with the given model.
    pub fn new(model: Box<dyn NetworkModel>) -> Self {
        Self {
            model,
            nodes: Vec::new(),
            node_ids: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Adds a node connected to the network with the given uplink and returns its id.
    ///
    /// Panics if a node with the same name already exists.
    pub fn add_node(&mut self, name: &str, uplink: Link) -> NodeId {
        assert!(!self.node_ids.contains_key(name), "Node `{}` already exists", name);
        let id = self.nodes.len();
        self.nodes.push(Node { name: name.to_string() });
        self.node_ids.insert(name.to_string(), id);
        self.model.on_node_added(id, uplink);
        debug!(target: "network", "Added node {} with uplink {:?}", name, uplink);
        id
    }

    /// Adds a link between two nodes.
    pub fn add_link(&mut self, src: &str, dst: &str, link: Link) {
        let (src_id, dst_id) = (self.expect_node(src), self.expect_node(dst));
        self.model.on_link_added(src_id, dst_id, link);
        debug!(target: "network", "Added link {} - {}: {:?}", src, dst, link);
    }

    /// Returns the id of node with the given name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_ids.get(name).copied()
    }

    fn expect_node(&self, name: &str) -> NodeId {
        match self.node_id(name) {
            Some(id) => id,
            None => panic!("Node `{}` does not exist", name),
        }
    }

    /// Returns the node names in the order of their addition.
    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Places the component on the node with the given name.
    pub fn set_location(&mut self, id: Id, node_name: &str) {
        let node = self.expect_node(node_name);
        self.locations.insert(id, node);
    }

    /// Returns the node the component is placed on.
    pub fn location(&self, id: Id) -> Option<NodeId> {
        self.locations.get(&id).copied()
    }

    fn expect_location(&self, id: Id) -> NodeId {
        match self.location(id) {
            Some(node) => node,
            None => panic!("Component {} is not placed on any network node", id),
        }
    }

    /// Checks whether two components are placed on the same node.
    pub fn check_same_node(&self, id1: Id, id2: Id) -> bool {
        self.expect_location(id1) == self.expect_location(id2)
    }

    /// Returns the network latency between two components.
    pub fn latency(&self, src: Id, dst: Id) -> f64 {
        self.model.latency(self.expect_location(src), self.expect_location(dst))
    }

    /// Returns the network bandwidth between two components.
    pub fn bandwidth(&self, src: Id, dst: Id) -> f64 {
        self.model.bandwidth(self.expect_location(src), self.expect_location(dst))
    }

    /// Returns the time needed to transfer `size` bytes between two components.
    pub fn transfer_time(&self, src: Id, dst: Id, size: f64) -> f64 {
        self.model
            .transfer_time(self.expect_location(src), self.expect_location(dst), size)
    }
}
