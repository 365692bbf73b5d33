//! Accessing simulation from components.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};

use crate::async_mode::{EventFuture, EventKey, TimerFuture};
use crate::component::Id;
use crate::event::{EventData, EventId};
use crate::state::SimulationState;

/// A facade for accessing the simulation state and producing events from simulation components.
///
/// Each context belongs to a named component and is used to emit events, read the current time,
/// spawn actors and await events or timers on behalf of this component.
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, sim_state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_ using the simulation-wide random number generator.
    pub fn rand(&self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Creates new event with specified payload, destination and delay, returns event id.
    ///
    /// Panics if the delay is negative.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use dsim_core::Simulation;
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct Ping {}
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp1_ctx = sim.create_context("comp1");
    /// let comp2_ctx = sim.create_context("comp2");
    /// let event_id = comp1_ctx.emit(Ping {}, comp2_ctx.id(), 1.5);
    /// assert_eq!(event_id, 0);
    /// sim.step();
    /// assert_eq!(sim.time(), 1.5);
    /// ```
    pub fn emit<T>(&self, data: T, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, delay)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination, returns event id.
    pub fn emit_now<T>(&self, data: T, dst: Id) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, dst, 0.)
    }

    /// Creates new event for itself with specified payload and delay, returns event id.
    pub fn emit_self<T>(&self, data: T, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, delay)
    }

    /// Creates new immediate event for itself with specified payload, returns event id.
    pub fn emit_self_now<T>(&self, data: T) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, self.id, self.id, 0.)
    }

    /// Creates new event with specified payload, source, destination and delay, returns event id.
    ///
    /// This is useful for models that deliver events on behalf of other components.
    pub fn emit_as<T>(&self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.sim_state.borrow_mut().add_event(data, src, dst, delay)
    }

    /// Cancels the specified event.
    pub fn cancel_event(&self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    /// Returns component name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.sim_state.borrow().lookup_name(id)
    }

    /// Spawns an actor task owned by this component.
    ///
    /// The task is polled for the first time on the next simulation step.
    /// Until the future completes, the component is reported among the active actors,
    /// see [`Simulation::run`](crate::Simulation::run).
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.sim_state.borrow_mut().spawn(Some(self.id), future);
    }

    /// Suspends the calling actor for the specified duration of simulation time.
    ///
    /// Panics if the duration is negative.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dsim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// sim.spawn(async move {
    ///     ctx.sleep(5.).await;
    ///     assert_eq!(ctx.time(), 5.);
    /// });
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 5.);
    /// ```
    pub fn sleep(&self, duration: f64) -> TimerFuture {
        self.sim_state
            .borrow_mut()
            .create_timer(self.id, duration, self.sim_state.clone())
    }

    /// Returns a future that completes when an event of type `T` is delivered to this component.
    ///
    /// While the future is pending, matching events are passed to it instead of the component's event handler.
    /// Panics if the same event is already awaited by this component.
    pub fn recv_event<T: EventData>(&self) -> EventFuture<T> {
        self.sim_state
            .borrow_mut()
            .create_event_future::<T>(self.id, None, self.sim_state.clone())
    }

    /// Returns a future that completes when an event of type `T` with the specified key is delivered to this component.
    ///
    /// The key getter for `T` must be registered beforehand with [`Self::register_key_getter_for`].
    pub fn recv_event_by_key<T: EventData>(&self, key: EventKey) -> EventFuture<T> {
        self.sim_state
            .borrow_mut()
            .create_event_future::<T>(self.id, Some(key), self.sim_state.clone())
    }

    /// Registers a function that extracts [`EventKey`] from events of type `T`.
    ///
    /// Registering a getter for the same type again replaces the previous one.
    pub fn register_key_getter_for<T: EventData>(&self, key_getter: impl Fn(&T) -> EventKey + 'static) {
        self.sim_state.borrow_mut().register_key_getter_for::<T>(key_getter);
    }
}
