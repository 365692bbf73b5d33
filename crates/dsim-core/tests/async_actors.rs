use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dsim_core::async_mode::EventKey;
use dsim_core::{Simulation, SimulationError};

#[derive(Clone, Serialize)]
struct Message {
    value: u32,
}

#[derive(Clone, Serialize)]
struct Reply {
    request_id: u64,
}

#[test]
fn test_sleep() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("sleeper");
    let times = Rc::new(RefCell::new(Vec::new()));
    let times_clone = times.clone();
    sim.spawn_actor(ctx.id(), async move {
        for _ in 0..3 {
            ctx.sleep(1.5).await;
            times_clone.borrow_mut().push(ctx.time());
        }
    });
    assert!(sim.run().is_ok());
    assert_eq!(*times.borrow(), vec![1.5, 3., 4.5]);
    assert!(sim.active_actors().is_empty());
}

#[test]
fn test_recv_event() {
    let mut sim = Simulation::new(123);
    let sender = sim.create_context("sender");
    let receiver = sim.create_context("receiver");
    let receiver_id = receiver.id();
    let received = Rc::new(RefCell::new(Vec::new()));
    let received_clone = received.clone();

    sim.spawn_actor(receiver_id, async move {
        for _ in 0..2 {
            let event = receiver.recv_event::<Message>().await;
            received_clone.borrow_mut().push((receiver.time(), event.data.value, event.src));
        }
    });
    sim.spawn_actor(sender.id(), async move {
        sender.sleep(10.).await;
        sender.emit(Message { value: 1 }, receiver_id, 5.);
        sender.sleep(1.).await;
        sender.emit(Message { value: 2 }, receiver_id, 4.);
    });

    assert!(sim.run().is_ok());
    assert_eq!(*received.borrow(), vec![(15., 1, 0), (15., 2, 0)]);
}

#[test]
fn test_recv_event_by_key() {
    let mut sim = Simulation::new(123);
    let server = sim.create_context("server");
    let client = Rc::new(sim.create_context("client"));
    let client_id = client.id();
    sim.register_key_getter_for::<Reply>(|reply: &Reply| reply.request_id as EventKey);

    // replies arrive in reverse order, each waiter gets its own
    server.emit(Reply { request_id: 2 }, client_id, 1.);
    server.emit(Reply { request_id: 1 }, client_id, 2.);

    let finished = Rc::new(RefCell::new(Vec::new()));
    for request_id in 1..=2 {
        let client = client.clone();
        let finished = finished.clone();
        sim.spawn_actor(client_id, async move {
            let reply = client.recv_event_by_key::<Reply>(request_id).await;
            finished.borrow_mut().push((client.time(), reply.data.request_id));
        });
    }

    assert!(sim.run().is_ok());
    assert_eq!(*finished.borrow(), vec![(1., 2), (2., 1)]);
}

#[test]
fn test_actor_spawning_actor() {
    let mut sim = Simulation::new(123);
    let parent = Rc::new(sim.create_context("parent"));
    let done = Rc::new(RefCell::new(false));
    let done_clone = done.clone();
    let parent_clone = parent.clone();
    sim.spawn_actor(parent.id(), async move {
        parent_clone.sleep(1.).await;
        let child_ctx = parent_clone.clone();
        parent_clone.spawn(async move {
            child_ctx.sleep(2.).await;
            *done_clone.borrow_mut() = true;
        });
    });
    assert!(sim.run().is_ok());
    assert!(*done.borrow());
    assert_eq!(sim.time(), 3.);
}

#[test]
fn test_deadlock_is_reported() {
    let mut sim = Simulation::new(123);
    let waiter = sim.create_context("waiter");
    let sleeper = sim.create_context("sleeper");
    sim.spawn_actor(waiter.id(), async move {
        waiter.recv_event::<Message>().await;
    });
    sim.spawn_actor(sleeper.id(), async move {
        sleeper.sleep(7.).await;
    });

    let err = sim.run().unwrap_err();
    assert_eq!(
        err,
        SimulationError::Deadlock {
            time: 7.,
            blocked: vec!["waiter".to_string()],
        }
    );
    assert!(err.to_string().contains("waiter"));
}

#[test]
fn test_dropped_simulation_releases_deadlocked_actor() {
    let mut sim = Simulation::new(123);
    let waiter = sim.create_context("waiter");
    let marker = Rc::new(());
    let weak = Rc::downgrade(&marker);
    sim.spawn_actor(waiter.id(), async move {
        let _marker = marker;
        waiter.recv_event::<Message>().await;
    });

    assert!(sim.run().is_err());
    assert!(weak.upgrade().is_some());
    drop(sim);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_dropped_simulation_releases_suspended_actors() {
    let mut sim = Simulation::new(123);
    let sleeper = sim.create_context("sleeper");
    let waiter = sim.create_context("waiter");
    let late = sim.create_context("late");
    let marker = Rc::new(());
    let weak = Rc::downgrade(&marker);

    let sleeper_marker = marker.clone();
    sim.spawn_actor(sleeper.id(), async move {
        let _marker = sleeper_marker;
        sleeper.sleep(100.).await;
    });
    let waiter_marker = marker.clone();
    sim.spawn_actor(waiter.id(), async move {
        let _marker = waiter_marker;
        waiter.recv_event::<Message>().await;
    });
    // spawned but never polled
    sim.spawn_actor(late.id(), async move {
        let _marker = marker;
        late.sleep(1.).await;
    });

    sim.step();
    sim.step();
    assert_eq!(sim.active_actors().len(), 3);
    drop(sim);
    assert!(weak.upgrade().is_none());
}

#[test]
#[should_panic(expected = "already exists")]
fn test_duplicate_await_panics() {
    let mut sim = Simulation::new(123);
    let ctx = Rc::new(sim.create_context("comp"));
    let ctx1 = ctx.clone();
    let ctx2 = ctx.clone();
    sim.spawn(async move {
        ctx1.recv_event::<Message>().await;
    });
    sim.spawn(async move {
        ctx2.recv_event::<Message>().await;
    });
    sim.step_until_no_events();
}

#[test]
fn test_dropped_event_future_releases_await() {
    let mut sim = Simulation::new(123);
    let ctx = Rc::new(sim.create_context("comp"));
    let ctx1 = ctx.clone();
    sim.spawn(async move {
        let future = ctx1.recv_event::<Message>();
        drop(future);
        // awaiting the same event again is allowed after the first future is dropped
        let event = ctx1.recv_event::<Message>().await;
        assert_eq!(event.data.value, 7);
    });
    sim.step();
    ctx.emit_self(Message { value: 7 }, 1.);
    assert!(sim.run().is_ok());
}
