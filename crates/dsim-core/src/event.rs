//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Event identifier.
pub type EventId = u64;

/// Trait that should be implemented by event payload.
///
/// It is implemented automatically for every serializable `'static` type.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// Representation of event.
pub struct Event {
    /// Unique event identifier, also defines the order of events with equal time.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Event {
    /// Converts the event into [`TypedEvent`] with payload of type `T`.
    ///
    /// Panics if the payload has a different type.
    pub fn downcast<T: EventData>(self) -> TypedEvent<T> {
        let Event { id, time, src, dst, data } = self;
        match data.downcast::<T>() {
            Ok(data) => TypedEvent {
                id,
                time,
                src,
                dst,
                data: *data,
            },
            Err(_) => panic!("Event {} payload is not of type {}", id, std::any::type_name::<T>()),
        }
    }
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted so that BinaryHeap pops the earliest event, ties are resolved by submission order.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Event with payload of known type, returned by event futures.
pub struct TypedEvent<T: EventData> {
    /// Unique event identifier.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: T,
}
