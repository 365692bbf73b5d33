use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dsim_core::{cast, Event, EventHandler, Id, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Ping {
    round: u32,
}

#[derive(Clone, Serialize)]
struct Pong {
    round: u32,
}

struct Player {
    peer: Id,
    rounds: u32,
    log: Rc<RefCell<Vec<(f64, String)>>>,
    ctx: SimulationContext,
}

impl EventHandler for Player {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Ping { round } => {
                self.log.borrow_mut().push((self.ctx.time(), format!("ping {}", round)));
                self.ctx.emit(Pong { round }, self.peer, 0.5);
            }
            Pong { round } => {
                self.log.borrow_mut().push((self.ctx.time(), format!("pong {}", round)));
                if round + 1 < self.rounds {
                    self.ctx.emit(Ping { round: round + 1 }, self.peer, 0.5);
                }
            }
        })
    }
}

#[test]
fn test_ping_pong_handlers() {
    let mut sim = Simulation::new(123);
    let log = Rc::new(RefCell::new(Vec::new()));
    let ctx1 = sim.create_context("player1");
    let ctx2 = sim.create_context("player2");
    let (id1, id2) = (ctx1.id(), ctx2.id());
    let player1 = Rc::new(RefCell::new(Player {
        peer: id2,
        rounds: 3,
        log: log.clone(),
        ctx: ctx1,
    }));
    let player2 = Rc::new(RefCell::new(Player {
        peer: id1,
        rounds: 3,
        log: log.clone(),
        ctx: ctx2,
    }));
    sim.add_handler("player1", player1.clone());
    sim.add_handler("player2", player2);

    player1.borrow().ctx.emit(Ping { round: 0 }, id2, 0.5);
    assert!(sim.run().is_ok());

    assert_eq!(sim.time(), 3.);
    let log = log.borrow();
    assert_eq!(log.len(), 6);
    assert_eq!(log[0], (0.5, "ping 0".to_string()));
    assert_eq!(log[5], (3., "pong 2".to_string()));
}

#[test]
fn test_same_name_returns_same_component() {
    let mut sim = Simulation::new(123);
    let ctx1 = sim.create_context("comp");
    let ctx2 = sim.create_context("comp");
    assert_eq!(ctx1.id(), ctx2.id());
    assert_eq!(sim.lookup_name(ctx1.id()), "comp");
}

#[test]
#[should_panic(expected = "does not exist")]
fn test_lookup_unknown_component() {
    let sim = Simulation::new(123);
    sim.lookup_id("missing");
}

#[test]
fn test_event_without_handler_is_dropped() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("sender");
    let nobody = sim.create_context("nobody");
    ctx.emit(Ping { round: 0 }, nobody.id(), 2.);
    assert!(sim.run().is_ok());
    assert_eq!(sim.time(), 2.);
}

#[test]
fn test_same_seed_same_random_sequence() {
    let mut sim1 = Simulation::new(42);
    let mut sim2 = Simulation::new(42);
    let seq1: Vec<u32> = (0..10).map(|_| sim1.gen_range(0..1000)).collect();
    let seq2: Vec<u32> = (0..10).map(|_| sim2.gen_range(0..1000)).collect();
    assert_eq!(seq1, seq2);
}
