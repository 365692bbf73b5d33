//! Asynchronous actors: tasks, executor and futures for awaiting events and timers.

pub(crate) mod channel;
pub mod event_future;
pub(crate) mod executor;
pub(crate) mod promise_store;
pub(crate) mod task;
pub mod timer_future;
pub(crate) mod waker;

pub use event_future::{EventFuture, EventKey};
pub use timer_future::TimerFuture;
