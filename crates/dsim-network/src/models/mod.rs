//! Network model implementations.

pub mod constant;
pub mod topology;

pub use constant::ConstantNetworkModel;
pub use topology::TopologyNetworkModel;
