//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
///
/// Events that are awaited by actors of the component (see
/// [`SimulationContext::recv_event`](crate::SimulationContext::recv_event)) are not passed to the handler.
pub trait EventHandler {
    /// Processes event.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use dsim_core::{cast, Event, EventHandler, Simulation, SimulationContext};
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct SomeEvent {
    ///     some_field: u32,
    /// }
    ///
    /// pub struct Component {
    ///     state: u32,
    ///     ctx: SimulationContext,
    /// }
    ///
    /// impl EventHandler for Component {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             SomeEvent { some_field } => {
    ///                 self.state = some_field;
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp1_ctx = sim.create_context("comp1");
    /// let comp2_ctx = sim.create_context("comp2");
    /// let comp2 = Rc::new(RefCell::new(Component { state: 0, ctx: comp2_ctx }));
    /// let comp2_id = sim.add_handler("comp2", comp2.clone());
    /// comp1_ctx.emit(SomeEvent { some_field: 16 }, comp2_id, 1.2);
    /// assert_eq!(comp2.borrow().state, 0);
    /// sim.step();
    /// assert_eq!(comp2.borrow().state, 16);
    /// ```
    fn on(&mut self, event: Event);
}

/// Enables the use of pattern matching syntax for processing different types of events
/// by downcasting the event payload from [`EventData`](crate::event::EventData) to user-defined types.
///
/// Match arms need not be exhaustive. If the event payload does not match any of specified arms,
/// the event is logged as unhandled under `ERROR` level.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
