//! Network node.

/// Unique node id.
pub type NodeId = usize;

/// A node in the network.
pub struct Node {
    /// Node name.
    pub name: String,
}
