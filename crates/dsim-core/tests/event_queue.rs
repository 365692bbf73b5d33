use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dsim_core::{cast, Event, EventHandler, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Tick {
    label: u32,
}

struct Recorder {
    seen: Rc<RefCell<Vec<(f64, u32)>>>,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        let time = event.time;
        cast!(match event.data {
            Tick { label } => {
                self.seen.borrow_mut().push((time, label));
            }
        })
    }
}

fn recorder_sim() -> (Simulation, SimulationContext, Rc<RefCell<Vec<(f64, u32)>>>) {
    let mut sim = Simulation::new(123);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let ctx = sim.create_context("recorder");
    sim.add_handler("recorder", Rc::new(RefCell::new(Recorder { seen: seen.clone() })));
    (sim, ctx, seen)
}

#[test]
fn test_events_fire_in_time_order() {
    let (mut sim, ctx, seen) = recorder_sim();
    ctx.emit_self(Tick { label: 1 }, 3.);
    ctx.emit_self(Tick { label: 2 }, 1.);
    ctx.emit_self(Tick { label: 3 }, 2.);
    sim.step_until_no_events();
    assert_eq!(*seen.borrow(), vec![(1., 2), (2., 3), (3., 1)]);
}

#[test]
fn test_equal_time_events_fire_in_submission_order() {
    let (mut sim, ctx, seen) = recorder_sim();
    for label in 0..20 {
        ctx.emit_self(Tick { label }, 5.);
    }
    sim.step_until_no_events();
    let labels: Vec<u32> = seen.borrow().iter().map(|(_, l)| *l).collect();
    assert_eq!(labels, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_events_and_timers_share_submission_order() {
    let (mut sim, ctx, seen) = recorder_sim();
    let actor_ctx = sim.create_context("actor");
    let order = seen.clone();
    ctx.emit_self(Tick { label: 1 }, 2.);
    sim.spawn_actor(actor_ctx.id(), async move {
        // the timer is created after the first tick and before the second one
        actor_ctx.sleep(2.).await;
        order.borrow_mut().push((actor_ctx.time(), 100));
    });
    // let the actor create its timer
    sim.step();
    ctx.emit_self(Tick { label: 2 }, 2.);
    sim.step_until_no_events();
    assert_eq!(*seen.borrow(), vec![(2., 1), (2., 100), (2., 2)]);
}

#[test]
fn test_cancelled_event_is_skipped() {
    let (mut sim, ctx, seen) = recorder_sim();
    let id = ctx.emit_self(Tick { label: 1 }, 1.);
    ctx.emit_self(Tick { label: 2 }, 2.);
    ctx.cancel_event(id);
    sim.step_until_no_events();
    assert_eq!(*seen.borrow(), vec![(2., 2)]);
    assert_eq!(sim.event_count(), 2);
}

#[test]
fn test_time_is_monotonic() {
    let (mut sim, ctx, _) = recorder_sim();
    for i in 0..50 {
        ctx.emit_self(Tick { label: i }, ((i * 37) % 11) as f64);
    }
    let mut last = sim.time();
    while sim.step() {
        assert!(sim.time() >= last);
        last = sim.time();
    }
    assert_eq!(last, 10.);
}

#[test]
fn test_step_for_duration() {
    let (mut sim, ctx, seen) = recorder_sim();
    ctx.emit_self(Tick { label: 1 }, 1.);
    ctx.emit_self(Tick { label: 2 }, 5.);
    assert!(sim.step_for_duration(2.));
    assert_eq!(seen.borrow().len(), 1);
    assert!(!sim.step_for_duration(10.));
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_tiny_negative_delay_is_clamped() {
    let (mut sim, ctx, seen) = recorder_sim();
    ctx.emit_self(Tick { label: 1 }, -1e-15);
    sim.step_until_no_events();
    assert_eq!(*seen.borrow(), vec![(0., 1)]);
}

#[test]
#[should_panic(expected = "Event delay is negative")]
fn test_negative_delay_panics() {
    let (_sim, ctx, _) = recorder_sim();
    ctx.emit_self(Tick { label: 1 }, -1.);
}

#[test]
#[should_panic(expected = "Timer delay is negative")]
fn test_negative_sleep_panics() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("sleeper");
    let _timer = ctx.sleep(-0.5);
}
