use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::async_mode::channel::Sender;
use crate::async_mode::event_future::{EventFuture, EventPromise};
use crate::async_mode::promise_store::EventPromiseStore;
use crate::async_mode::task::{Task, TaskId};
use crate::async_mode::timer_future::{TimerFuture, TimerPromise};
use crate::async_mode::EventKey;
use crate::component::Id;
use crate::event::{Event, EventData, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

type KeyGetterFn = Rc<dyn Fn(&dyn EventData) -> EventKey>;

/// Next pending item of the simulation queue.
pub(crate) enum Pending {
    Event(Event),
    Timer(TimerPromise),
}

pub struct SimulationState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    canceled_events: HashSet<EventId>,
    timers: BinaryHeap<TimerPromise>,
    // shared by events and timers to order them consistently
    sequence: u64,
    event_count: u64,

    component_name_to_id: HashMap<String, Id>,
    component_names: Vec<String>,

    event_promises: EventPromiseStore,
    key_getters: HashMap<TypeId, KeyGetterFn>,

    executor: Sender<Rc<Task>>,
    task_count: TaskId,
    live_tasks: BTreeMap<TaskId, Option<Id>>,
}

impl SimulationState {
    pub(crate) fn new(seed: u64, executor: Sender<Rc<Task>>) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            canceled_events: HashSet::new(),
            timers: BinaryHeap::new(),
            sequence: 0,
            event_count: 0,
            component_name_to_id: HashMap::new(),
            component_names: Vec::new(),
            event_promises: EventPromiseStore::new(),
            key_getters: HashMap::new(),
            executor,
            task_count: 0,
            live_tasks: BTreeMap::new(),
        }
    }

    // Components ------------------------------------------------------------------------------------------------------

    pub fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.component_name_to_id.get(name) {
            return id;
        }
        let id = self.component_names.len() as Id;
        self.component_name_to_id.insert(name.to_owned(), id);
        self.component_names.push(name.to_owned());
        id
    }

    pub fn lookup_id(&self, name: &str) -> Id {
        match self.component_name_to_id.get(name) {
            Some(&id) => id,
            None => panic!("Component with name `{}` does not exist", name),
        }
    }

    pub fn try_lookup_id(&self, name: &str) -> Option<Id> {
        self.component_name_to_id.get(name).copied()
    }

    pub fn lookup_name(&self, id: Id) -> String {
        match self.component_names.get(id as usize) {
            Some(name) => name.clone(),
            None => panic!("Component with id {} does not exist", id),
        }
    }

    // Clock and randomness --------------------------------------------------------------------------------------------

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    // Events ----------------------------------------------------------------------------------------------------------

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        let id = self.next_sequence();
        let event = Event {
            id,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data: Box::new(data),
        };
        if delay >= -EPSILON {
            self.events.push(event);
            self.event_count += 1;
            id
        } else {
            log_incorrect_event(event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
    }

    pub fn cancel_event(&mut self, id: EventId) {
        self.canceled_events.insert(id);
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    fn peek_event(&mut self) -> Option<&Event> {
        while let Some(event) = self.events.peek() {
            let id = event.id;
            if self.canceled_events.remove(&id) {
                self.events.pop();
            } else {
                break;
            }
        }
        self.events.peek()
    }

    /// Removes the earliest event or timer from the queue and advances the clock to its time.
    pub(crate) fn next_pending(&mut self) -> Option<Pending> {
        let event_key = self.peek_event().map(|e| (e.time, e.id));
        let timer_key = self.timers.peek().map(|t| (t.time, t.id));
        let take_event = match (event_key, timer_key) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((event_time, event_id)), Some((timer_time, timer_id))) => {
                event_time.total_cmp(&timer_time).then(event_id.cmp(&timer_id)).is_lt()
            }
        };
        if take_event {
            let event = self.events.pop()?;
            self.clock = event.time;
            Some(Pending::Event(event))
        } else {
            let timer = self.timers.pop()?;
            self.clock = timer.time;
            Some(Pending::Timer(timer))
        }
    }

    /// Returns the time of the earliest pending event or timer.
    pub fn peek_time(&mut self) -> Option<f64> {
        let event_time = self.peek_event().map(|e| e.time);
        let timer_time = self.timers.peek().map(|t| t.time);
        match (event_time, timer_time) {
            (Some(e), Some(t)) => Some(e.min(t)),
            (e, t) => e.or(t),
        }
    }

    // Tasks -----------------------------------------------------------------------------------------------------------

    pub fn spawn(&mut self, owner: Option<Id>, future: impl std::future::Future<Output = ()> + 'static) {
        let task_id = self.task_count;
        self.task_count += 1;
        self.live_tasks.insert(task_id, owner);
        Task::spawn(task_id, future, self.executor.clone());
    }

    pub fn on_task_completed(&mut self, task_id: TaskId) {
        self.live_tasks.remove(&task_id);
    }

    pub fn live_task_owners(&self) -> Vec<String> {
        self.live_tasks
            .iter()
            .map(|(task_id, owner)| match owner {
                Some(id) => self.lookup_name(*id),
                None => format!("task#{}", task_id),
            })
            .collect()
    }

    // Timers ----------------------------------------------------------------------------------------------------------

    pub fn create_timer(&mut self, component_id: Id, delay: f64, sim_state: Rc<RefCell<SimulationState>>) -> TimerFuture {
        assert!(
            delay >= -EPSILON,
            "Timer delay is negative ({}) for component `{}`",
            delay,
            self.lookup_name(component_id)
        );
        let id = self.next_sequence();
        let promise = TimerPromise::new(id, component_id, self.clock + delay.max(0.));
        let future = promise.future(sim_state);
        self.timers.push(promise);
        future
    }

    // Event futures and promises --------------------------------------------------------------------------------------

    pub fn create_event_future<T: EventData>(
        &mut self,
        dst: Id,
        key: Option<EventKey>,
        sim_state: Rc<RefCell<SimulationState>>,
    ) -> EventFuture<T> {
        // checked before the future exists, since dropping it would access the borrowed state
        if self.event_promises.contains::<T>(dst, key) {
            panic!(
                "Event promise for {} awaited by `{}` with key {:?} already exists",
                std::any::type_name::<T>(),
                self.lookup_name(dst),
                key
            );
        }
        let (promise, future) = EventPromise::contract(sim_state, dst, key);
        self.event_promises.insert::<T>(dst, key, promise);
        future
    }

    pub fn event_key_for(&self, event: &Event) -> Option<EventKey> {
        let type_id = Any::type_id(event.data.as_any());
        self.key_getters.get(&type_id).map(|getter| getter(event.data.as_ref()))
    }

    pub(crate) fn take_event_promise(&mut self, event: &Event, key: Option<EventKey>) -> Option<EventPromise> {
        self.event_promises.remove_for(event, key)
    }

    /// Removes all pending event and timer promises.
    pub(crate) fn take_promises(&mut self) -> (Vec<EventPromise>, Vec<TimerPromise>) {
        let timers = std::mem::take(&mut self.timers).into_vec();
        (self.event_promises.drain(), timers)
    }

    // Called by dropped EventFuture that was not completed.
    pub fn on_incomplete_event_future_drop<T: EventData>(&mut self, dst: Id, key: Option<EventKey>) {
        self.event_promises.remove::<T>(dst, key);
    }

    pub fn register_key_getter_for<T: EventData>(&mut self, key_getter: impl Fn(&T) -> EventKey + 'static) {
        self.key_getters.insert(
            TypeId::of::<T>(),
            Rc::new(move |raw_data| match raw_data.downcast_ref::<T>() {
                Some(data) => key_getter(data),
                None => panic!(
                    "Key getter for type {} is incorrectly used for type {}",
                    std::any::type_name::<T>(),
                    serde_type_name::type_name(&raw_data).unwrap_or("unknown"),
                ),
            }),
        );
    }
}
