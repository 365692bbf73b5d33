//! Asynchronous waiting for timers.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::state::SimulationState;
use crate::Id;

/// Timer identifier, drawn from the same sequence as event identifiers.
pub(crate) type TimerId = u64;

// Timer future --------------------------------------------------------------------------------------------------------

/// Future that represents asynchronous waiting for timer completion.
///
/// Returned by [`SimulationContext::sleep`](crate::SimulationContext::sleep).
pub struct TimerFuture {
    state: Rc<RefCell<TimerAwaitState>>,
    // keeps the simulation alive while the timer is awaited
    _sim_state: Rc<RefCell<SimulationState>>,
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if state.completed {
            Poll::Ready(())
        } else {
            state.waker = Some(async_ctx.waker().clone());
            Poll::Pending
        }
    }
}

// Timer promise -------------------------------------------------------------------------------------------------------

pub(crate) struct TimerPromise {
    pub id: TimerId,
    /// Component that set the timer.
    pub component_id: Id,
    /// The time when the timer fires.
    pub time: f64,
    state: Rc<RefCell<TimerAwaitState>>,
}

impl TimerPromise {
    pub fn new(id: TimerId, component_id: Id, time: f64) -> Self {
        Self {
            id,
            component_id,
            time,
            state: Rc::new(RefCell::new(TimerAwaitState {
                completed: false,
                waker: None,
            })),
        }
    }

    pub fn future(&self, sim_state: Rc<RefCell<SimulationState>>) -> TimerFuture {
        TimerFuture {
            state: self.state.clone(),
            _sim_state: sim_state,
        }
    }

    // Releases the awaiting task without resuming it.
    pub fn cancel(self) {
        let waker = self.state.borrow_mut().waker.take();
        drop(waker);
    }

    pub fn complete(self) {
        // the waker is taken out first so that the state is not borrowed while the task is scheduled
        let waker = {
            let mut state = self.state.borrow_mut();
            state.completed = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Eq for TimerPromise {}

impl PartialEq for TimerPromise {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for TimerPromise {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for TimerPromise {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerAwaitState {
    completed: bool,
    waker: Option<Waker>,
}
