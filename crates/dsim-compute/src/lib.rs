//! Models of computing resources.
//!
//! - [`fair_sharing`]: fair sharing of resource throughput among concurrent activities.
//! - [`compute`]: a [`Compute`] component executing computations with fair sharing of its speed.
//! - [`vm`]: virtual machines which borrow a part of host speed proportional to their cores.

#![warn(missing_docs)]

pub mod compute;
pub mod fair_sharing;
pub mod vm;

pub use compute::{CompFinished, Compute};
pub use fair_sharing::FairSharingModel;
pub use vm::VirtualMachine;
