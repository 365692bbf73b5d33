//! Asynchronous waiting for events.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::event::{Event, EventData, TypedEvent};
use crate::state::SimulationState;
use crate::Id;

/// Type of key that distinguishes awaited events of the same type, e.g. a request id.
///
/// Keys are extracted from event payloads by functions registered with
/// [`SimulationContext::register_key_getter_for`](crate::SimulationContext::register_key_getter_for).
pub type EventKey = u64;

// Event future --------------------------------------------------------------------------------------------------------

/// Future that represents asynchronous waiting for an event of type `T` sent to a component.
pub struct EventFuture<T: EventData> {
    state: Rc<RefCell<AwaitEventState>>,
    sim_state: Rc<RefCell<SimulationState>>,
    component_id: Id,
    event_key: Option<EventKey>,
    _data: PhantomData<T>,
}

impl<T: EventData> Future for EventFuture<T> {
    type Output = TypedEvent<T>;

    fn poll(self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.event.take() {
            Some(event) => Poll::Ready(event.downcast::<T>()),
            None => {
                state.waker = Some(async_ctx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T: EventData> Drop for EventFuture<T> {
    fn drop(&mut self) {
        if !self.state.borrow().completed {
            self.sim_state
                .borrow_mut()
                .on_incomplete_event_future_drop::<T>(self.component_id, self.event_key);
        }
    }
}

// Event promise -------------------------------------------------------------------------------------------------------

pub(crate) struct EventPromise {
    state: Rc<RefCell<AwaitEventState>>,
}

impl EventPromise {
    pub fn contract<T: EventData>(
        sim_state: Rc<RefCell<SimulationState>>,
        dst: Id,
        event_key: Option<EventKey>,
    ) -> (Self, EventFuture<T>) {
        let state = Rc::new(RefCell::new(AwaitEventState {
            completed: false,
            waker: None,
            event: None,
        }));
        let future = EventFuture {
            state: state.clone(),
            sim_state,
            component_id: dst,
            event_key,
            _data: PhantomData,
        };
        (Self { state }, future)
    }

    // Releases the awaiting task without resuming it.
    pub fn cancel(self) {
        let waker = self.state.borrow_mut().waker.take();
        drop(waker);
    }

    pub fn complete(self, event: Event) {
        let waker = {
            let mut state = self.state.borrow_mut();
            assert!(!state.completed, "internal error: event promise is completed twice");
            state.completed = true;
            state.event = Some(event);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

// State shared between future and promise -----------------------------------------------------------------------------

struct AwaitEventState {
    completed: bool,
    waker: Option<Waker>,
    event: Option<Event>,
}
