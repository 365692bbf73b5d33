//! A library for modeling communication between simulation components.
//!
//! Components are placed on network nodes, and the [`NetworkModel`] defines the latency and bandwidth between
//! the nodes. Actors communicate through named [`Mailbox`]es: a message sent to a mailbox is delivered to its
//! receiver after the transfer time on the route between the sender and receiver locations.

#![warn(missing_docs)]

pub mod link;
pub mod mailbox;
pub mod model;
pub mod models;
pub mod network;
pub mod node;

pub use link::Link;
pub use mailbox::{Mailbox, Mailboxes, Message};
pub use model::NetworkModel;
pub use network::Network;
pub use node::{Node, NodeId};
