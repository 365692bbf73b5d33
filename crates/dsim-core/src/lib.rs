//! Discrete-event simulation engine with cooperative asynchronous actors.
//!
//! The engine owns a virtual clock and a time-ordered queue of pending events and timers.
//! Components either react to events through [`EventHandler`] callbacks or run as actors,
//! i.e. futures spawned via [`Simulation::spawn_actor`] which suspend while waiting for events or timers.

#![warn(missing_docs)]

pub mod async_mode;
pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{Event, EventData, EventId, TypedEvent};
pub use handler::EventHandler;
pub use simulation::{Simulation, SimulationError};
pub use state::EPSILON;
