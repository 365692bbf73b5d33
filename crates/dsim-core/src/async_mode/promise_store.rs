use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::event_future::EventPromise;
use super::EventKey;
use crate::{Event, EventData, Id};

// Pending event promises indexed by destination component, payload type and optional event key.
pub(crate) struct EventPromiseStore {
    promises: HashMap<AwaitKey, EventPromise>,
}

impl EventPromiseStore {
    pub fn new() -> Self {
        Self {
            promises: HashMap::new(),
        }
    }

    pub fn contains<T: EventData>(&self, dst: Id, event_key: Option<EventKey>) -> bool {
        self.promises.contains_key(&AwaitKey::new::<T>(dst, event_key))
    }

    pub fn insert<T: EventData>(&mut self, dst: Id, event_key: Option<EventKey>, promise: EventPromise) {
        let key = AwaitKey::new::<T>(dst, event_key);
        if self.promises.contains_key(&key) {
            panic!("Event promise {:?} already exists", key);
        }
        self.promises.insert(key, promise);
    }

    pub fn drain(&mut self) -> Vec<EventPromise> {
        self.promises.drain().map(|(_, promise)| promise).collect()
    }

    pub fn remove<T: EventData>(&mut self, dst: Id, event_key: Option<EventKey>) -> Option<EventPromise> {
        self.promises.remove(&AwaitKey::new::<T>(dst, event_key))
    }

    pub fn remove_for(&mut self, event: &Event, event_key: Option<EventKey>) -> Option<EventPromise> {
        let data_type = Any::type_id(event.data.as_any());
        // a keyed event may also be awaited without key
        if event_key.is_some() {
            if let Some(promise) = self.promises.remove(&AwaitKey {
                dst: event.dst,
                data_type,
                event_key,
            }) {
                return Some(promise);
            }
        }
        self.promises.remove(&AwaitKey {
            dst: event.dst,
            data_type,
            event_key: None,
        })
    }
}

#[derive(Hash, PartialEq, Eq, Debug, Clone, Copy)]
struct AwaitKey {
    dst: Id,
    data_type: TypeId,
    event_key: Option<EventKey>,
}

impl AwaitKey {
    fn new<T: EventData>(dst: Id, event_key: Option<EventKey>) -> Self {
        Self {
            dst,
            data_type: TypeId::of::<T>(),
            event_key,
        }
    }
}
