//! Simulation configuration and execution.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use serde_json::json;
use serde_type_name::type_name;

use crate::async_mode::channel::channel;
use crate::async_mode::executor::Executor;
use crate::async_mode::EventKey;
use crate::component::Id;
use crate::context::SimulationContext;
use crate::event::EventData;
use crate::handler::EventHandler;
use crate::log::log_undelivered_event;
use crate::state::{Pending, SimulationState};
use crate::Event;

/// Terminal conditions of a simulation run other than normal completion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// No events or timers are pending, but some actors are still suspended and can never be resumed.
    #[error("no progress possible at time {time}: {} actor(s) blocked forever: {}", .blocked.len(), .blocked.join(", "))]
    Deadlock {
        /// Simulation time when the deadlock was detected.
        time: f64,
        /// Names of components owning the blocked actors.
        blocked: Vec<String>,
    },
}

/// Represents a simulation, provides methods for its configuration and execution.
///
/// The simulation is single-threaded: exactly one event handler or actor runs at a time,
/// and shared state is accessed through `Rc<RefCell<..>>` without locking.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
    executor: Executor,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        let (task_sender, task_receiver) = channel();
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed, task_sender))),
            handlers: Vec::new(),
            executor: Executor::new(task_receiver),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        let id = self.sim_state.borrow_mut().register(name);
        if self.handlers.len() <= id as usize {
            self.handlers.resize_with(id as usize + 1, || None);
        }
        id
    }

    /// Returns the identifier of component by its name.
    ///
    /// Panics if component with such name does not exist.
    pub fn lookup_id(&self, name: &str) -> Id {
        self.sim_state.borrow().lookup_id(name)
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such identifier does not exist.
    pub fn lookup_name(&self, id: Id) -> String {
        self.sim_state.borrow().lookup_name(id)
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Creating a context with an already registered name returns a context for the same component.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dsim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(comp_ctx.id(), 0);
    /// assert_eq!(comp_ctx.name(), "comp");
    /// assert_eq!(sim.lookup_id("comp"), 0);
    /// ```
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        let ctx = SimulationContext::new(id, name.as_ref(), self.sim_state.clone());
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created context: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Registers the event handler implementation for component with specified name, returns the component id.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Added handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
        id
    }

    /// Removes the event handler of component with specified name.
    ///
    /// Subsequent events destined to the component are logged as undelivered.
    pub fn remove_handler<S>(&mut self, name: S)
    where
        S: AsRef<str>,
    {
        let id = self.lookup_id(name.as_ref());
        self.handlers[id as usize] = None;
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Removed handler: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "id": id})
        );
    }

    /// Spawns an actor owned by the component with specified id.
    ///
    /// The actor starts running on the next simulation step and is considered active until its future completes.
    pub fn spawn_actor(&mut self, owner: Id, future: impl Future<Output = ()> + 'static) {
        self.sim_state.borrow_mut().spawn(Some(owner), future);
    }

    /// Spawns a task not associated with any component.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dsim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// sim.spawn(async move {
    ///     ctx.sleep(1.).await;
    ///     ctx.sleep(2.).await;
    /// });
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 3.);
    /// ```
    pub fn spawn(&mut self, future: impl Future<Output = ()> + 'static) {
        self.sim_state.borrow_mut().spawn(None, future);
    }

    /// Registers a function that extracts [`EventKey`] from events of type `T`.
    pub fn register_key_getter_for<T: EventData>(&self, key_getter: impl Fn(&T) -> EventKey + 'static) {
        self.sim_state.borrow_mut().register_key_getter_for::<T>(key_getter);
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Performs a single step through the simulation.
    ///
    /// If some actors were woken up, polls the first of them without advancing the time.
    /// Otherwise takes the earliest pending event or timer (ties are resolved in the order of their creation),
    /// advances the simulation time and completes the corresponding future or invokes the event handler.
    ///
    /// Returns `true` if some work was done and `false` if there is nothing left to process.
    pub fn step(&mut self) -> bool {
        if let Some((task_id, completed)) = self.executor.process_task() {
            if completed {
                self.sim_state.borrow_mut().on_task_completed(task_id);
            }
            return true;
        }
        let next = self.sim_state.borrow_mut().next_pending();
        match next {
            Some(Pending::Event(event)) => {
                self.deliver(event);
                true
            }
            Some(Pending::Timer(timer)) => {
                if log_enabled!(Trace) {
                    let name = self.lookup_name(timer.component_id);
                    trace!(
                        target: &name,
                        "[{:.3} {} {}] timer fired",
                        timer.time,
                        crate::log::get_colored("TIMER", colored::Color::BrightBlack),
                        name,
                    );
                }
                timer.complete();
                true
            }
            None => false,
        }
    }

    fn deliver(&mut self, event: Event) {
        if log_enabled!(Trace) {
            let src_name = self.lookup_name(event.src);
            let dst_name = self.lookup_name(event.dst);
            trace!(
                target: &dst_name,
                "[{:.3} {} {}] {}",
                event.time,
                crate::log::get_colored("EVENT", colored::Color::BrightBlack),
                dst_name,
                json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": src_name})
            );
        }
        let promise = {
            let mut state = self.sim_state.borrow_mut();
            let key = state.event_key_for(&event);
            state.take_event_promise(&event, key)
        };
        if let Some(promise) = promise {
            promise.complete(event);
            return;
        }
        let handler = self.handlers.get(event.dst as usize).and_then(|h| h.clone());
        match handler {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(event),
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending work and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no pending events, timers or woken up actors left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Returns `true` if there could be more pending work and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        loop {
            if !self.executor.has_scheduled_tasks() {
                match self.sim_state.borrow_mut().peek_time() {
                    Some(time) if time > end_time => return true,
                    Some(_) => {}
                    None => return false,
                }
            }
            self.step();
        }
    }

    /// Runs the simulation to completion.
    ///
    /// Returns [`SimulationError::Deadlock`] if, after all events and timers are processed,
    /// some actors are still suspended, i.e. they wait for something that will never happen.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use dsim_core::{Simulation, SimulationError};
    ///
    /// #[derive(Clone, Serialize)]
    /// struct Ping {}
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("waiter");
    /// sim.spawn_actor(ctx.id(), async move {
    ///     ctx.recv_event::<Ping>().await;
    /// });
    /// match sim.run() {
    ///     Err(SimulationError::Deadlock { blocked, .. }) => assert_eq!(blocked, vec!["waiter".to_string()]),
    ///     Ok(()) => panic!("expected deadlock"),
    /// }
    /// ```
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.step_until_no_events();
        let blocked = self.active_actors();
        if blocked.is_empty() {
            debug!(
                target: "simulation",
                "[{:.3} {} simulation] Completed after {} events",
                self.time(),
                crate::log::get_colored("DEBUG", colored::Color::Blue),
                self.event_count(),
            );
            Ok(())
        } else {
            Err(SimulationError::Deadlock {
                time: self.time(),
                blocked,
            })
        }
    }

    /// Returns the names of components owning actors that have not completed yet.
    pub fn active_actors(&self) -> Vec<String> {
        self.sim_state.borrow().live_task_owners()
    }

    /// Returns a random float in the range _[0, 1)_ using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns the total number of created events.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Suspended actors hold the state through their futures and the state holds them through wakers.
        // The promises are taken out first, since dropping an actor future accesses the state.
        let (event_promises, timers) = self.sim_state.borrow_mut().take_promises();
        for promise in event_promises {
            promise.cancel();
        }
        for timer in timers {
            timer.cancel();
        }
        self.executor.clear();
    }
}
