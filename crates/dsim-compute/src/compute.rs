//! Computing resource with fair sharing of its speed among running computations.

use std::cell::RefCell;

use serde::Serialize;

use dsim_core::{cast, log_debug, log_trace, Event, EventHandler, EventId, Id, SimulationContext};

use crate::fair_sharing::FairSharingModel;

#[derive(Serialize, Clone)]
struct RunningComputation {
    id: u64,
    flops: f64,
    requester: Id,
}

// EVENTS //////////////////////////////////////////////////////////////////////////////////////////

/// Request to start a computation, see [`Compute::run`].
#[derive(Serialize, Clone)]
pub struct CompRequest {
    /// Amount of work.
    pub flops: f64,
    /// Component which is notified on completion.
    pub requester: Id,
}

#[derive(Serialize, Clone)]
struct InternalCompFinished {
    computation: RunningComputation,
}

/// Notification sent to the requester when its computation is completed.
///
/// The event key of this event is the computation id.
#[derive(Serialize, Clone)]
pub struct CompFinished {
    /// Computation id returned by [`Compute::run`].
    pub id: u64,
}

// RESOURCE ////////////////////////////////////////////////////////////////////////////////////////

/// Computing resource with the given speed (flop/s).
///
/// All running computations progress simultaneously, each at `speed / n` where `n` is the number of running
/// computations. Computations cannot be preempted or cancelled.
pub struct Compute {
    speed: f64,
    model: FairSharingModel<RunningComputation>,
    next_event: Option<EventId>,
    ctx: SimulationContext,
}

impl Compute {
    /// Creates a resource with the given speed.
    ///
    /// Panics if the speed is not positive.
    pub fn new(speed: f64, ctx: SimulationContext) -> Self {
        assert!(speed > 0., "Speed of compute resource `{}` must be positive: {}", ctx.name(), speed);
        ctx.register_key_getter_for::<CompFinished>(|event: &CompFinished| event.id);
        Self {
            speed,
            model: FairSharingModel::with_fixed_throughput(speed),
            next_event: None,
            ctx,
        }
    }

    /// Returns the identifier of the resource component.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Returns the resource speed.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Returns the number of running computations.
    pub fn running_count(&self) -> usize {
        self.model.len()
    }

    /// Starts a computation of `flops` on behalf of `requester` and returns its id.
    ///
    /// The computation starts at the current time. On completion [`CompFinished`] is sent to `requester`.
    /// Panics if `flops` is negative.
    pub fn run(&mut self, flops: f64, requester: Id) -> u64 {
        assert!(flops >= 0., "Computation size must be non-negative: {}", flops);
        self.ctx.emit_self_now(CompRequest { flops, requester })
    }

    fn schedule_next_completion(&mut self) {
        if let Some(event_id) = self.next_event.take() {
            self.ctx.cancel_event(event_id);
        }
        if let Some((time, computation)) = self.model.peek() {
            let delay = (time - self.ctx.time()).max(0.);
            self.next_event = Some(self.ctx.emit_self(
                InternalCompFinished {
                    computation: computation.clone(),
                },
                delay,
            ));
        }
    }
}

impl EventHandler for Compute {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            CompRequest { flops, requester } => {
                assert!(flops >= 0., "Computation size must be non-negative: {}", flops);
                self.model.insert(
                    self.ctx.time(),
                    flops,
                    RunningComputation {
                        id: event.id,
                        flops,
                        requester,
                    },
                );
                log_trace!(
                    self.ctx,
                    "started computation {} ({} flops), running: {}",
                    event.id,
                    flops,
                    self.model.len()
                );
                self.schedule_next_completion();
            }
            InternalCompFinished { computation } => {
                self.next_event = None;
                let finished = self.model.pop().map(|(_, c)| c.id);
                assert_eq!(
                    finished,
                    Some(computation.id),
                    "Unexpected completion of computation {} on `{}`",
                    computation.id,
                    self.ctx.name()
                );
                log_debug!(
                    self.ctx,
                    "finished computation {} ({} flops)",
                    computation.id,
                    computation.flops
                );
                self.ctx
                    .emit_now(CompFinished { id: computation.id }, computation.requester);
                self.schedule_next_completion();
            }
        })
    }
}

/// Runs a computation on the resource on behalf of the actor owning `ctx` and waits for its completion.
///
/// # Examples
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use dsim_core::Simulation;
/// use dsim_compute::compute::{execute, Compute};
///
/// let mut sim = Simulation::new(123);
/// let compute = Rc::new(RefCell::new(Compute::new(10., sim.create_context("host"))));
/// sim.add_handler("host", compute.clone());
/// let ctx = sim.create_context("actor");
/// sim.spawn_actor(ctx.id(), async move {
///     execute(&compute, &ctx, 25.).await;
///     assert_eq!(ctx.time(), 2.5);
/// });
/// assert!(sim.run().is_ok());
/// ```
pub async fn execute(compute: &RefCell<Compute>, ctx: &SimulationContext, flops: f64) {
    let id = compute.borrow_mut().run(flops, ctx.id());
    ctx.recv_event_by_key::<CompFinished>(id).await;
}
